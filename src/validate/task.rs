//! Validation tasks and the worker pool that runs them.
//!
//! A task is a plain value naming what to check and where. Tasks share
//! nothing but the read-only [`SchemaCache`], so the pool runs them in any
//! order; results are merged in task order regardless of completion order.

use crate::layout::{self, Level, SIZES_FILE};
use crate::report::{Issue, ValidationResult};
use crate::validate::folder::validate_folder_name;
use crate::validate::logo::validate_logo;
use crate::validate::schema::{SchemaCache, load_json};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde_json::Value;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Validate the manifest at `path` against a schema.
    Json { schema: &'static str },
    /// Check the logo declared by the manifest in directory `path`.
    Logo { declared: String },
    /// Compare directory `path` with its manifest's name.
    Folder { level: Level },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTask {
    pub name: String,
    pub path: PathBuf,
    pub kind: TaskKind,
}

impl ValidationTask {
    pub fn execute(&self, schemas: &SchemaCache) -> ValidationResult {
        match &self.kind {
            TaskKind::Json { schema } => schemas.validate_file(&self.path, schema),
            TaskKind::Logo { declared } => validate_logo(&self.path, declared),
            TaskKind::Folder { level } => validate_folder_name(&self.path, *level),
        }
    }
}

/// Run every task on `pool`, converting a panicking task into one error.
pub fn run_tasks(
    pool: &ThreadPool,
    tasks: &[ValidationTask],
    schemas: &SchemaCache,
) -> ValidationResult {
    let results: Vec<ValidationResult> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| guarded(&task.name, || task.execute(schemas)))
            .collect()
    });
    let mut merged = ValidationResult::new();
    for result in results {
        merged.merge(result);
    }
    merged
}

fn guarded(name: &str, run: impl FnOnce() -> ValidationResult) -> ValidationResult {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(payload) => ValidationResult::from_iter([Issue::error(
            "System",
            format!(
                "Task '{name}' failed with exception: {}",
                panic_message(payload.as_ref())
            ),
            None,
        )]),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Task collection
// ============================================================================

fn all_dirs(data_dir: &Path, stores_dir: &Path) -> io::Result<Vec<layout::EntityDir>> {
    let mut dirs = layout::data_dirs(data_dir)?;
    dirs.extend(layout::store_dirs(stores_dir)?);
    Ok(dirs)
}

/// One schema task per existing manifest, plus one per `sizes.json`.
pub fn collect_json_tasks(data_dir: &Path, stores_dir: &Path) -> io::Result<Vec<ValidationTask>> {
    let mut tasks = Vec::new();
    for dir in all_dirs(data_dir, stores_dir)? {
        let manifest = dir.manifest_path();
        if manifest.is_file() {
            tasks.push(ValidationTask {
                name: format!("{} JSON: {}", dir.level.label(), dir.name()),
                path: manifest,
                kind: TaskKind::Json {
                    schema: dir.level.schema(),
                },
            });
        }
        let sizes = dir.path.join(SIZES_FILE);
        if dir.level == Level::Variant && sizes.is_file() {
            tasks.push(ValidationTask {
                name: format!("Sizes JSON: {}", dir.name()),
                path: sizes,
                kind: TaskKind::Json { schema: "sizes" },
            });
        }
    }
    Ok(tasks)
}

/// One logo task per brand or store manifest declaring a `logo`.
pub fn collect_logo_tasks(data_dir: &Path, stores_dir: &Path) -> io::Result<Vec<ValidationTask>> {
    let brands = layout::data_dirs(data_dir)?
        .into_iter()
        .filter(|d| d.level == Level::Brand);
    let mut tasks = Vec::new();
    for dir in brands.chain(layout::store_dirs(stores_dir)?) {
        let Some(document) = load_json(&dir.manifest_path()) else {
            continue;
        };
        if let Some(Value::String(declared)) = document.get("logo") {
            tasks.push(ValidationTask {
                name: format!("{} Logo: {}", dir.level.label(), dir.name()),
                kind: TaskKind::Logo {
                    declared: declared.clone(),
                },
                path: dir.path,
            });
        }
    }
    Ok(tasks)
}

/// One folder task per entity directory.
pub fn collect_folder_tasks(data_dir: &Path, stores_dir: &Path) -> io::Result<Vec<ValidationTask>> {
    Ok(all_dirs(data_dir, stores_dir)?
        .into_iter()
        .map(|dir| ValidationTask {
            name: format!("{} Folder: {}", dir.level.label(), dir.name()),
            kind: TaskKind::Folder { level: dir.level },
            path: dir.path,
        })
        .collect())
}
