//! Logo file checks.
//!
//! | Rule | Applies to |
//! |---|---|
//! | declared name is a bare file name | every declared logo |
//! | file exists | every declared logo (stops further checks) |
//! | file name is `logo.png`, `logo.jpg` or `logo.svg` | existing files |
//! | square, 100..=400 px per side | raster files |

use crate::report::{Issue, ValidationResult};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const LOGO_MIN_SIZE: u32 = 100;
pub const LOGO_MAX_SIZE: u32 = 400;

static LOGO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^logo\.(png|jpg|svg)$").expect("logo pattern is valid"));

/// Check the logo `declared` in the manifest of `owner_dir`.
pub fn validate_logo(owner_dir: &Path, declared: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let logo_path = owner_dir.join(declared);

    if let Some(sep) = declared.chars().find(|c| matches!(c, '/' | '\\')) {
        result.push(Issue::error(
            "Logo",
            format!("Logo path '{declared}' contains '{sep}' - only use filename"),
            Some(owner_dir),
        ));
    }

    if !logo_path.is_file() {
        result.add_error("Logo", "Logo file not found", Some(&logo_path));
        return result;
    }

    let file_name = logo_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !LOGO_NAME.is_match(&file_name) {
        result.add_error(
            "Logo",
            format!("Logo name '{file_name}' must be 'logo.png', 'logo.jpg' or 'logo.svg'"),
            Some(&logo_path),
        );
    }

    if file_name.ends_with(".svg") {
        return result;
    }
    match image::image_dimensions(&logo_path) {
        Ok((width, height)) => {
            if width != height {
                result.add_error(
                    "Logo",
                    format!("Logo must be square (width={width}, height={height})"),
                    Some(&logo_path),
                );
            }
            if width < LOGO_MIN_SIZE || height < LOGO_MIN_SIZE {
                result.add_error(
                    "Logo",
                    format!("Logo dimensions too small (minimum {LOGO_MIN_SIZE}x{LOGO_MIN_SIZE})"),
                    Some(&logo_path),
                );
            }
            if width > LOGO_MAX_SIZE || height > LOGO_MAX_SIZE {
                result.add_error(
                    "Logo",
                    format!("Logo dimensions too large (maximum {LOGO_MAX_SIZE}x{LOGO_MAX_SIZE})"),
                    Some(&logo_path),
                );
            }
        }
        Err(e) => {
            result.add_error("Logo", format!("Failed to read image: {e}"), Some(&logo_path));
        }
    }
    result
}
