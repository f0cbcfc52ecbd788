//! Required manifest presence.

use crate::layout::{self, EntityDir, Level, SIZES_FILE};
use crate::report::ValidationResult;
use std::io;
use std::path::Path;

/// Report every entity directory lacking a required file, one error per file.
pub fn validate_required_files(data_dir: &Path, stores_dir: &Path) -> io::Result<ValidationResult> {
    let mut result = ValidationResult::new();
    let dirs = layout::data_dirs(data_dir)?
        .into_iter()
        .chain(layout::store_dirs(stores_dir)?);
    for dir in dirs {
        for file in required_files(&dir) {
            if !dir.path.join(file).is_file() {
                result.add_error("Missing File", format!("Missing {file}"), Some(&dir.path));
            }
        }
    }
    Ok(result)
}

fn required_files(dir: &EntityDir) -> Vec<&'static str> {
    match dir.level {
        Level::Variant => vec![Level::Variant.manifest(), SIZES_FILE],
        level => vec![level.manifest()],
    }
}
