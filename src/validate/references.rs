//! Checks over every `sizes.json`: store references and barcode formats.

use crate::layout::{self, Level, SIZES_FILE};
use crate::report::ValidationResult;
use crate::validate::schema::load_json;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static GTIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12,13}$").expect("gtin pattern is valid"));
static EAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{13}$").expect("ean pattern is valid"));

/// Every existing `sizes.json` under `data_dir`, in traversal order.
pub fn sizes_files(data_dir: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(layout::data_dirs(data_dir)?
        .into_iter()
        .filter(|d| d.level == Level::Variant)
        .map(|d| d.path.join(SIZES_FILE))
        .filter(|p| p.is_file())
        .collect())
}

/// Size entries of a parsed `sizes.json`; a lone object counts as one entry.
fn entries(document: &Value) -> Vec<&Value> {
    match document {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![document],
        _ => Vec::new(),
    }
}

/// Declared `id` of every store manifest.
pub fn declared_store_ids(stores_dir: &Path) -> io::Result<HashSet<String>> {
    Ok(layout::store_dirs(stores_dir)?
        .iter()
        .filter_map(|d| load_json(&d.manifest_path()))
        .filter_map(|doc| doc.get("id").and_then(Value::as_str).map(str::to_string))
        .collect())
}

/// Flag purchase links whose `store_id` names no store.
pub fn validate_store_ids(data_dir: &Path, stores_dir: &Path) -> io::Result<ValidationResult> {
    let known = declared_store_ids(stores_dir)?;
    let mut result = ValidationResult::new();

    for path in sizes_files(data_dir)? {
        let Some(document) = load_json(&path) else {
            continue;
        };
        for (size_idx, size) in entries(&document).into_iter().enumerate() {
            let Some(links) = size.get("purchase_links").and_then(Value::as_array) else {
                continue;
            };
            for (link_idx, link) in links.iter().enumerate() {
                let store_id = match link.get("store_id") {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(s)) if s.is_empty() => continue,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                };
                if !known.contains(&store_id) {
                    let location = format!("$[{size_idx}].purchase_links[{link_idx}]");
                    result.add_error(
                        "StoreID",
                        format!("Invalid store_id '{store_id}' at {location}"),
                        Some(&path),
                    );
                }
            }
        }
    }
    Ok(result)
}

/// Barcode rules: `gtin` is 12 or 13 digits, `ean` exactly 13, and when both
/// are 13 digits they agree.
pub fn validate_gtin(data_dir: &Path) -> io::Result<ValidationResult> {
    let mut result = ValidationResult::new();

    for path in sizes_files(data_dir)? {
        let Some(document) = load_json(&path) else {
            continue;
        };
        for (idx, size) in entries(&document).into_iter().enumerate() {
            let gtin = size.get("gtin").filter(|v| !v.is_null());
            let ean = size.get("ean").filter(|v| !v.is_null());

            if gtin.is_some_and(|g| !g.as_str().is_some_and(|g| GTIN.is_match(g))) {
                result.add_error(
                    "GTIN",
                    format!("Invalid gtin at $[{idx}]: must be 12 or 13 digits"),
                    Some(&path),
                );
            }
            if ean.is_some_and(|e| !e.as_str().is_some_and(|e| EAN.is_match(e))) {
                result.add_error(
                    "EAN",
                    format!("Invalid ean at $[{idx}]: must be exactly 13 digits"),
                    Some(&path),
                );
            }
            if let (Some(Value::String(gtin)), Some(Value::String(ean))) = (gtin, ean) {
                if gtin.chars().count() == 13 && ean.chars().count() == 13 && gtin != ean {
                    result.add_error(
                        "GTIN/EAN",
                        format!(
                            "Mismatch at $[{idx}]: gtin and ean are both 13 digits but not equal"
                        ),
                        Some(&path),
                    );
                }
            }
        }
    }
    Ok(result)
}
