//! Maintenance scripts run through `ofd script <name> [args...]`.
//!
//! Scripts live in a static registry rather than being discovered at runtime.
//! Each entry parses its own arguments, so the CLI forwards everything after
//! the script name untouched.
//!
//! | Script | Purpose |
//! |---|---|
//! | `style_data` | Reorder manifest keys to schema order, normalize indentation |

pub mod style_data;

use crate::validate::ValidateError;
use crate::validate::schema::SchemaError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Validation error: {0}")]
    Validate(#[from] ValidateError),
    #[error("unknown script '{0}'")]
    Unknown(String),
    #[error("{0}")]
    Usage(String),
}

/// Source locations and settings shared by every script.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub data_dir: PathBuf,
    pub stores_dir: PathBuf,
    pub schemas_dir: PathBuf,
    pub workers: usize,
}

/// What a script reports back: a verdict plus script-specific data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptOutcome {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

pub type ScriptFn = fn(&ScriptContext, &[String]) -> Result<ScriptOutcome, ScriptError>;

pub struct ScriptEntry {
    pub name: &'static str,
    pub description: &'static str,
    /// Flags worth listing in `ofd script --list`.
    pub key_args: &'static [&'static str],
    pub run: ScriptFn,
}

pub static SCRIPTS: &[ScriptEntry] = &[ScriptEntry {
    name: "style_data",
    description: "Sort JSON keys according to schema definitions and fix formatting",
    key_args: &["--dry-run", "--fix-indent-only", "--validate"],
    run: style_data::run,
}];

pub fn find(name: &str) -> Option<&'static ScriptEntry> {
    SCRIPTS.iter().find(|s| s.name == name)
}

pub fn run_script(
    name: &str,
    ctx: &ScriptContext,
    args: &[String],
) -> Result<ScriptOutcome, ScriptError> {
    let entry = find(name).ok_or_else(|| ScriptError::Unknown(name.to_string()))?;
    (entry.run)(ctx, args)
}
