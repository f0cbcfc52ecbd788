//! JSON Schema loading and manifest validation.
//!
//! A [`SchemaCache`] is built once per command from the schemas directory
//! and handed to every task that needs it. Schemas reference each other by
//! relative file name (`"$ref": "./material_types_schema.json"`); those
//! references resolve against the cache, never the network or disk.

use crate::report::{Issue, ValidationResult};
use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Every schema file, by schema name.
pub const SCHEMA_NAMES: &[&str] = &[
    "store",
    "brand",
    "material",
    "material_types",
    "filament",
    "variant",
    "sizes",
];

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schemas directory does not exist: {}", .0.display())]
    MissingDir(PathBuf),
    #[error("schema file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to parse schema {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema '{name}' does not compile: {message}")]
    Compile { name: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn schema_file_name(name: &str) -> String {
    format!("{name}_schema.json")
}

/// Serves `$ref` targets from the loaded schema documents.
struct CachedRetriever {
    by_file: Arc<HashMap<String, Value>>,
}

impl Retrieve for CachedRetriever {
    fn retrieve(
        &self,
        uri: &Uri<String>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let file = uri.as_str().rsplit('/').next().unwrap_or_default();
        self.by_file
            .get(file)
            .cloned()
            .ok_or_else(|| format!("schema reference not found: {uri}").into())
    }
}

pub struct SchemaCache {
    dir: PathBuf,
    documents: HashMap<String, Value>,
    validators: HashMap<String, Validator>,
}

impl SchemaCache {
    /// Load and compile every schema under `dir`.
    pub fn load(dir: &Path) -> Result<Self, SchemaError> {
        if !dir.is_dir() {
            return Err(SchemaError::MissingDir(dir.to_path_buf()));
        }

        let mut documents = HashMap::new();
        let mut by_file = HashMap::new();
        for name in SCHEMA_NAMES {
            let path = dir.join(schema_file_name(name));
            if !path.is_file() {
                return Err(SchemaError::MissingFile(path));
            }
            let text = fs::read_to_string(&path)?;
            let schema: Value = serde_json::from_str(&text)
                .map_err(|source| SchemaError::Parse { path, source })?;
            by_file.insert(schema_file_name(name), schema.clone());
            documents.insert(name.to_string(), schema);
        }

        let by_file = Arc::new(by_file);
        let mut validators = HashMap::new();
        for (name, schema) in &documents {
            let validator = jsonschema::options()
                .with_retriever(CachedRetriever {
                    by_file: Arc::clone(&by_file),
                })
                .build(schema)
                .map_err(|e| SchemaError::Compile {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            validators.insert(name.clone(), validator);
        }
        debug!(dir = %dir.display(), count = validators.len(), "schemas loaded");

        Ok(Self {
            dir: dir.to_path_buf(),
            documents,
            validators,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw schema document.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.documents.get(name)
    }

    /// Validate one manifest file against the named schema.
    ///
    /// Reports every violation, each with its location in the document.
    pub fn validate_file(&self, path: &Path, name: &str) -> ValidationResult {
        let Some(document) = load_json(path) else {
            return ValidationResult::from_iter([Issue::error(
                "JSON",
                "Failed to load JSON file",
                Some(path),
            )]);
        };
        let Some(validator) = self.validators.get(name) else {
            return ValidationResult::from_iter([Issue::error(
                "JSON",
                format!("Schema '{name}' not found"),
                Some(path),
            )]);
        };
        validator
            .iter_errors(&document)
            .map(|err| {
                let location = json_path(&err.instance_path().to_string());
                Issue::error(
                    "JSON",
                    format!("Schema validation failed: {err} at {location}"),
                    Some(path),
                )
            })
            .collect()
    }
}

/// Read and parse a JSON file, `None` on any failure.
pub fn load_json(path: &Path) -> Option<Value> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// `/0/gtin` → `$[0].gtin`.
fn json_path(pointer: &str) -> String {
    let mut out = String::from("$");
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            out.push_str(&format!("[{segment}]"));
        } else {
            out.push('.');
            out.push_str(&segment);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{setup_fixtures, write_json};
    use serde_json::json;

    #[test]
    fn pointer_to_json_path() {
        assert_eq!(json_path(""), "$");
        assert_eq!(json_path("/name"), "$.name");
        assert_eq!(json_path("/0/gtin"), "$[0].gtin");
        assert_eq!(json_path("/0/purchase_links/1/url"), "$[0].purchase_links[1].url");
        assert_eq!(json_path("/a~1b"), "$.a/b");
    }

    #[test]
    fn loads_fixture_schemas() {
        let tmp = setup_fixtures();
        let cache = SchemaCache::load(&tmp.path().join("schemas")).unwrap();
        for name in SCHEMA_NAMES {
            assert!(cache.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn missing_dir_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = SchemaCache::load(&tmp.path().join("schemas")).err().unwrap();
        assert!(matches!(err, SchemaError::MissingDir(_)));
    }

    #[test]
    fn missing_file_is_fatal() {
        let tmp = setup_fixtures();
        fs::remove_file(tmp.path().join("schemas/variant_schema.json")).unwrap();
        let err = SchemaCache::load(&tmp.path().join("schemas")).err().unwrap();
        assert!(matches!(err, SchemaError::MissingFile(_)));
    }

    #[test]
    fn valid_manifest_has_no_issues() {
        let tmp = setup_fixtures();
        let cache = SchemaCache::load(&tmp.path().join("schemas")).unwrap();
        let path = tmp.path().join("brand.json");
        write_json(&path, &json!({"id": "acme", "name": "Acme", "logo": "logo.png"}));
        assert!(cache.validate_file(&path, "brand").is_empty());
    }

    #[test]
    fn violation_names_location() {
        let tmp = setup_fixtures();
        let cache = SchemaCache::load(&tmp.path().join("schemas")).unwrap();
        let path = tmp.path().join("sizes.json");
        write_json(&path, &json!([{"filament_weight": "heavy"}]));
        let result = cache.validate_file(&path, "sizes");
        assert_eq!(result.error_count(), 1);
        let message = &result.errors[0].message;
        assert!(message.starts_with("Schema validation failed: "), "{message}");
        assert!(message.ends_with("at $[0].filament_weight"), "{message}");
    }

    #[test]
    fn cross_schema_reference_resolves() {
        let tmp = setup_fixtures();
        let cache = SchemaCache::load(&tmp.path().join("schemas")).unwrap();
        let path = tmp.path().join("material.json");
        write_json(&path, &json!({"material": "UNOBTANIUM"}));
        let result = cache.validate_file(&path, "material");
        assert_eq!(result.error_count(), 1);
        assert!(result.errors[0].message.ends_with("at $.material"));

        write_json(&path, &json!({"material": "PLA"}));
        assert!(cache.validate_file(&path, "material").is_empty());
    }

    #[test]
    fn unparseable_manifest() {
        let tmp = setup_fixtures();
        let cache = SchemaCache::load(&tmp.path().join("schemas")).unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{").unwrap();
        let result = cache.validate_file(&path, "brand");
        assert_eq!(result.errors[0].message, "Failed to load JSON file");
    }
}
