//! Validation engine.
//!
//! Works on the raw source trees, never on a crawled [`Database`], so it
//! reports problems in data the crawler could not normalize.
//!
//! | Stage | Entry point | Categories | Parallel |
//! |---|---|---|---|
//! | `missing_files` | [`Orchestrator::validate_missing_files`] | `Missing File` | no |
//! | `json_files` | [`Orchestrator::validate_json_files`] | `JSON` | yes |
//! | `logo_files` | [`Orchestrator::validate_logo_files`] | `Logo` | yes |
//! | `folder_names` | [`Orchestrator::validate_folder_names`] | `Folder` | yes |
//! | `store_ids` | [`Orchestrator::validate_store_ids`] | `StoreID` | no |
//! | `gtin` | [`Orchestrator::validate_gtin`] | `GTIN`, `EAN`, `GTIN/EAN` | no |
//!
//! [`Orchestrator::validate_all`] runs the stages in the order above. A
//! panicking task is reported as one `System` error and never aborts the
//! batch.
//!
//! [`Database`]: crate::model::Database

pub mod folder;
pub mod logo;
pub mod missing;
pub mod references;
pub mod schema;
pub mod task;

use crate::report::ValidationResult;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use schema::SchemaCache;
use serde::Serialize;
use std::path::{Path, PathBuf};
use task::ValidationTask;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

/// Stage boundary event reported by [`Orchestrator::validate_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stage: &'static str,
    pub percent: u8,
    pub message: &'static str,
}

impl Progress {
    fn new(stage: &'static str, percent: u8, message: &'static str) -> Self {
        Self {
            kind: "progress",
            stage,
            percent,
            message,
        }
    }
}

type ProgressFn<'a> = Box<dyn Fn(&Progress) + 'a>;
type StageFn<'a> = fn(&Orchestrator<'a>) -> Result<ValidationResult, ValidateError>;

pub struct Orchestrator<'a> {
    data_dir: PathBuf,
    stores_dir: PathBuf,
    schemas: &'a SchemaCache,
    pool: ThreadPool,
    workers: usize,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        data_dir: &Path,
        stores_dir: &Path,
        schemas: &'a SchemaCache,
        workers: usize,
    ) -> Result<Self, ValidateError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            stores_dir: stores_dir.to_path_buf(),
            schemas,
            pool,
            workers,
            progress: None,
        })
    }

    /// Receive stage start/finish events during [`Self::validate_all`].
    pub fn with_progress(mut self, callback: impl Fn(&Progress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn emit(&self, stage: &'static str, percent: u8, message: &'static str) {
        if let Some(callback) = &self.progress {
            callback(&Progress::new(stage, percent, message));
        }
    }

    fn run(&self, category: &str, tasks: Vec<ValidationTask>) -> ValidationResult {
        info!(category, tasks = tasks.len(), workers = self.workers, "running validation tasks");
        task::run_tasks(&self.pool, &tasks, self.schemas)
    }

    pub fn validate_missing_files(&self) -> Result<ValidationResult, ValidateError> {
        Ok(missing::validate_required_files(&self.data_dir, &self.stores_dir)?)
    }

    pub fn validate_json_files(&self) -> Result<ValidationResult, ValidateError> {
        let tasks = task::collect_json_tasks(&self.data_dir, &self.stores_dir)?;
        Ok(self.run("json", tasks))
    }

    pub fn validate_logo_files(&self) -> Result<ValidationResult, ValidateError> {
        let tasks = task::collect_logo_tasks(&self.data_dir, &self.stores_dir)?;
        Ok(self.run("logo", tasks))
    }

    pub fn validate_folder_names(&self) -> Result<ValidationResult, ValidateError> {
        let tasks = task::collect_folder_tasks(&self.data_dir, &self.stores_dir)?;
        Ok(self.run("folder", tasks))
    }

    pub fn validate_store_ids(&self) -> Result<ValidationResult, ValidateError> {
        Ok(references::validate_store_ids(&self.data_dir, &self.stores_dir)?)
    }

    pub fn validate_gtin(&self) -> Result<ValidationResult, ValidateError> {
        Ok(references::validate_gtin(&self.data_dir)?)
    }

    pub fn validate_all(&self) -> Result<ValidationResult, ValidateError> {
        let stages: [(&'static str, &'static str, &'static str, StageFn<'a>); 6] = [
            (
                "missing_files",
                "Checking for missing required files...",
                "Missing files check complete",
                Self::validate_missing_files,
            ),
            (
                "json_files",
                "Validating JSON files...",
                "JSON validation complete",
                Self::validate_json_files,
            ),
            (
                "logo_files",
                "Validating logo files...",
                "Logo validation complete",
                Self::validate_logo_files,
            ),
            (
                "folder_names",
                "Validating folder names...",
                "Folder name validation complete",
                Self::validate_folder_names,
            ),
            (
                "store_ids",
                "Validating store IDs...",
                "Store ID validation complete",
                Self::validate_store_ids,
            ),
            (
                "gtin",
                "Validating GTIN/EAN...",
                "GTIN/EAN validation complete",
                Self::validate_gtin,
            ),
        ];

        let mut result = ValidationResult::new();
        for (stage, start, done, run) in stages {
            self.emit(stage, 0, start);
            result.merge(run(self)?);
            self.emit(stage, 100, done);
        }
        Ok(result)
    }
}
