//! Folder-name agreement.
//!
//! A data folder is named after its entity: the manifest's `id` (or
//! `material` for material folders), falling back to the display name when
//! no id is declared. Declared names are compared after
//! [`cleanse_folder_name`]; a name holding a filesystem-illegal character
//! cannot round-trip to disk, so its folder is accepted as-is.
//!
//! A folder without a manifest is left to the missing-file check.

use crate::layout::{self, Level};
use crate::naming::{cleanse_folder_name, has_illegal_character};
use crate::report::ValidationResult;
use crate::validate::schema::load_json;
use std::path::Path;

pub fn validate_folder_name(dir: &Path, level: Level) -> ValidationResult {
    let mut result = ValidationResult::new();
    let manifest = level.manifest();
    let Some(document) = load_json(&dir.join(manifest)) else {
        return result;
    };

    let (key, declared) = [level.folder_key(), level.display_key()]
        .into_iter()
        .find_map(|key| document.get(key).and_then(|v| v.as_str()).map(|v| (key, v)))
        .unwrap_or((level.folder_key(), ""));

    let expected = cleanse_folder_name(declared);
    let actual = layout::dir_name(dir);
    if actual != expected && !has_illegal_character(declared) {
        result.add_error(
            "Folder",
            format!(
                "Folder name '{actual}' does not match '{key}' value '{expected}' in {manifest}"
            ),
            Some(dir),
        );
    }
    result
}
