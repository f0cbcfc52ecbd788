//! Name handling shared by the crawler, validators and exporters.
//!
//! ## Slugs
//!
//! Every entity gets a URL-safe slug used for file names in the exported
//! API tree:
//! - `"Prusament PLA"` → `"prusament-pla"`
//! - `"Galaxy_Black"` → `"galaxy-black"`
//! - `"PLA+ (HS)"` → `"pla-hs"`
//!
//! ## Folder Names
//!
//! Data directories are named after the entity they hold. A declared name
//! containing `/` cannot be a folder name, so the folder uses a space instead
//! (see [`cleanse_folder_name`]). Names with any of [`ILLEGAL_CHARACTERS`] are
//! necessarily lossy on disk and are exempt from folder-name checks.
//!
//! ## Colors
//!
//! Hand-entered hex colors are normalized to uppercase `#RRGGBB` by
//! [`normalize_color_hex`]. Anything unparseable passes through unchanged.

use regex::Regex;
use std::sync::LazyLock;

/// Characters that cannot appear in a folder name on every platform.
pub const ILLEGAL_CHARACTERS: &[char] = &[
    '#', '%', '&', '{', '}', '\\', '<', '>', '*', '?', '/', '$', '!', '\'', '"', ':', '@', '`',
    '|', '=',
];

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("separator pattern is valid"));
static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("slug pattern is valid"));
static DASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("dash pattern is valid"));

/// Convert text to a URL-friendly slug.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let dashed = SEPARATORS.replace_all(&lowered, "-");
    let stripped = NON_SLUG.replace_all(&dashed, "");
    let collapsed = DASH_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Render a declared name the way it appears as a folder name.
pub fn cleanse_folder_name(name: &str) -> String {
    name.replace('/', " ").trim().to_string()
}

pub fn has_illegal_character(name: &str) -> bool {
    name.contains(ILLEGAL_CHARACTERS)
}

/// Normalize a color to `#RRGGBB`.
///
/// Accepts 3 or 6 hex digits with or without a leading `#`, surrounding
/// whitespace ignored. Returns `None` for empty input and the trimmed input
/// unchanged when it is not a recognizable hex color.
pub fn normalize_color_hex(color: &str) -> Option<String> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(trimmed.to_string());
    }
    match digits.len() {
        6 => Some(format!("#{}", digits.to_ascii_uppercase())),
        3 => {
            let doubled: String = digits.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", doubled.to_ascii_uppercase()))
        }
        _ => Some(trimmed.to_string()),
    }
}
