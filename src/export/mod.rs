//! Dataset exporters.
//!
//! Every exporter reads a crawled [`Database`] and writes one family of
//! artifacts below the output directory:
//!
//! | Exporter | Output | Contents |
//! |---|---|---|
//! | [`json`] | `json/` | `all.json`, `all.json.gz`, `all.ndjson`, `brands/<slug>.json` |
//! | [`csv`] | `csv/` | one file per entity kind |
//! | [`sqlite`] | `sqlite/` | `filaments.db`, `stores.db` and their `.xz` companions |
//! | [`api`] | `api/v1/` | static API tree, logos, schemas |
//! | [`checksums`] | `manifest.json` | sha256 and size of every other artifact |
//!
//! [`export_all`] runs the enabled exporters in that order and finishes with
//! the manifest, so the manifest always describes the whole tree.
//!
//! ## Serialization
//!
//! JSON-based outputs use the public `Serialize` form of the entities
//! (`directory_name` hidden, `logo` published as `logo_name`). CSV and
//! SQLite go through the explicit column tables in [`crate::model`].

pub mod api;
pub mod checksums;
pub mod csv;
pub mod json;
pub mod sqlite;

use crate::model::Database;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("Logo file not found for {owner} '{name}': {}", .path.display())]
    MissingLogo {
        owner: &'static str,
        name: String,
        path: PathBuf,
    },
}

/// Dataset version and timestamp stamped into every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportMeta {
    pub version: String,
    pub generated_at: String,
}

impl ExportMeta {
    /// Version `YYYY.MM.DD` and timestamp `YYYY-MM-DDTHH:MM:SSZ` of `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            version: at.format("%Y.%m.%d").to_string(),
            generated_at: at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Source trees the API exporter reads logos and schemas from.
#[derive(Debug, Clone)]
pub struct SourceDirs {
    pub data_dir: PathBuf,
    pub stores_dir: PathBuf,
    pub schemas_dir: PathBuf,
}

/// Which exporters [`export_all`] runs. The manifest is always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formats {
    pub json: bool,
    pub sqlite: bool,
    pub csv: bool,
    pub api: bool,
}

impl Default for Formats {
    fn default() -> Self {
        Self {
            json: true,
            sqlite: true,
            csv: true,
            api: true,
        }
    }
}

/// Run the enabled exporters into `out_dir`, then write the manifest.
pub fn export_all(
    db: &Database,
    out_dir: &Path,
    meta: &ExportMeta,
    sources: &SourceDirs,
    formats: Formats,
) -> Result<checksums::Manifest, ExportError> {
    fs::create_dir_all(out_dir)?;

    if formats.json {
        json::export_json(db, out_dir, meta)?;
    }
    if formats.sqlite {
        sqlite::export_sqlite(db, out_dir, meta)?;
    }
    if formats.csv {
        csv::export_csv(db, out_dir)?;
    }
    if formats.api {
        api::export_api(db, out_dir, meta, sources)?;
    }

    let manifest = checksums::write_manifest(out_dir, meta)?;
    info!(
        artifacts = manifest.artifact_count,
        out_dir = %out_dir.display(),
        "export complete"
    );
    Ok(manifest)
}

// ============================================================================
// Shared writers
// ============================================================================

/// Write `bytes` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "written");
    Ok(())
}

/// Write `value` as 2-space indented JSON.
pub(crate) fn write_pretty<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), ExportError> {
    let text = serde_json::to_string_pretty(value)?;
    write_file(path, text.as_bytes())?;
    Ok(())
}

/// Public JSON form of an entity as an object that callers can extend.
pub(crate) fn object<T: Serialize>(entity: &T) -> Result<Map<String, Value>, ExportError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// `path` with `suffix` appended to its file name (`a.db` -> `a.db.xz`).
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
