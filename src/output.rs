//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Validate
//!
//! Issues are grouped by category, categories sorted, issues in the order
//! the validators reported them:
//!
//! ```text
//! GTIN (1)
//!     ERROR Invalid gtin at $[0]: must be 12 or 13 digits
//!         Source: data/Prusament/PLA/Prusament PLA/Orange/sizes.json
//! Logo (1)
//!     ERROR Logo file not found
//!         Source: stores/filament_shop/store.json
//!
//! 2 errors, 0 warnings
//! ```
//!
//! ## Build
//!
//! ```text
//! Crawled
//!     brands          1
//!     materials       1
//!     ...
//!
//! Exported 31 files to dist
//!     api/v1/index.json  1.2 KiB
//!     ...
//! ```
//!
//! ## Script
//!
//! ```text
//! style_data  Sort JSON keys according to schema definitions and fix formatting
//!     --dry-run --fix-indent-only --validate
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::export::checksums::Manifest;
use crate::model::Database;
use crate::report::Report;
use crate::scripts::{ScriptEntry, ScriptOutcome};
use crate::validate::Progress;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Human-readable byte count.
fn format_bytes(size: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB"];
    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

// ============================================================================
// Reports
// ============================================================================

/// Grouped issues followed by an error/warning tally.
pub fn format_report(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();
    for (category, issues) in report.by_category() {
        lines.push(format!("{} ({})", category, issues.len()));
        for issue in issues {
            lines.push(format!("{}{} {}", indent(1), issue.level, issue.message));
            if let Some(path) = &issue.path {
                lines.push(format!("{}Source: {}", indent(2), path.display()));
            }
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_report_summary(report));
    lines
}

pub fn format_report_summary(report: &Report) -> String {
    if report.is_empty() {
        return "All checks passed".to_string();
    }
    format!(
        "{}, {}",
        plural(report.error_count(), "error"),
        plural(report.warning_count(), "warning")
    )
}

pub fn print_report(report: &Report) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

/// One JSON line per progress event.
pub fn format_progress(progress: &Progress) -> String {
    serde_json::to_string(progress).unwrap_or_default()
}

pub fn print_progress(progress: &Progress) {
    println!("{}", format_progress(progress));
}

// ============================================================================
// Build
// ============================================================================

pub fn format_crawl_counts(db: &Database) -> Vec<String> {
    let mut lines = vec!["Crawled".to_string()];
    for (name, count) in db.stats() {
        lines.push(format!("{}{:<16}{}", indent(1), name, count));
    }
    lines
}

pub fn print_crawl_counts(db: &Database) {
    for line in format_crawl_counts(db) {
        println!("{}", line);
    }
}

/// Every artifact of an export with its size.
pub fn format_export_inventory(manifest: &Manifest, out_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Exported {} to {}",
        plural(manifest.artifact_count, "file"),
        out_dir.display()
    )];
    let width = manifest
        .artifacts
        .iter()
        .map(|a| a.path.len())
        .max()
        .unwrap_or(0);
    for artifact in &manifest.artifacts {
        lines.push(format!(
            "{}{:<width$}  {}",
            indent(1),
            artifact.path,
            format_bytes(artifact.size)
        ));
    }
    lines
}

pub fn print_export_inventory(manifest: &Manifest, out_dir: &Path) {
    for line in format_export_inventory(manifest, out_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Scripts
// ============================================================================

pub fn format_script_list(scripts: &[ScriptEntry]) -> Vec<String> {
    let width = scripts.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut lines = Vec::new();
    for script in scripts {
        lines.push(format!("{:<width$}  {}", script.name, script.description));
        if !script.key_args.is_empty() {
            lines.push(format!("{}{}", indent(1), script.key_args.join(" ")));
        }
    }
    lines
}

pub fn print_script_list(scripts: &[ScriptEntry]) {
    for line in format_script_list(scripts) {
        println!("{}", line);
    }
}

/// Verdict line plus any `stats` the script reported.
pub fn format_script_outcome(name: &str, outcome: &ScriptOutcome) -> Vec<String> {
    let verdict = if outcome.success { "ok" } else { "FAILED" };
    let mut lines = vec![format!("{} {}: {}", name, verdict, outcome.message)];
    if let Some(stats) = outcome.data.get("stats").and_then(|s| s.as_object()) {
        for (key, value) in stats {
            lines.push(format!("{}{}: {}", indent(1), key, value));
        }
    }
    lines
}

pub fn print_script_outcome(name: &str, outcome: &ScriptOutcome) {
    for line in format_script_outcome(name, outcome) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::checksums::Artifact;
    use crate::report::Issue;
    use crate::scripts::{ScriptContext, ScriptError};
    use serde_json::{Map, json};

    fn noop(_: &ScriptContext, _: &[String]) -> Result<ScriptOutcome, ScriptError> {
        unreachable!()
    }

    #[test]
    fn empty_report_passes() {
        assert_eq!(format_report(&Report::new()), ["All checks passed"]);
    }

    #[test]
    fn report_groups_by_category() {
        let report: Report = [
            Issue::error("Logo", "Logo file not found", Some(Path::new("stores/x/store.json"))),
            Issue::warning("GTIN", "gtin odd", None),
            Issue::error("GTIN", "Invalid gtin at $[0]: must be 12 or 13 digits", None),
        ]
        .into_iter()
        .collect();
        let lines = format_report(&report);
        assert_eq!(
            lines,
            [
                "GTIN (2)",
                "    WARNING gtin odd",
                "    ERROR Invalid gtin at $[0]: must be 12 or 13 digits",
                "Logo (1)",
                "    ERROR Logo file not found",
                "        Source: stores/x/store.json",
                "",
                "2 errors, 1 warning",
            ]
        );
    }

    #[test]
    fn progress_is_one_json_line() {
        let line = format_progress(&Progress {
            kind: "progress",
            stage: "gtin",
            percent: 100,
            message: "GTIN checks complete",
        });
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&line).unwrap(),
            json!({
                "type": "progress",
                "stage": "gtin",
                "percent": 100,
                "message": "GTIN checks complete"
            })
        );
    }

    #[test]
    fn crawl_counts_list_every_table() {
        let lines = format_crawl_counts(&Database::default());
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[1], format!("    {:<16}0", "brands"));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn export_inventory_aligns_paths() {
        let manifest = Manifest {
            dataset_version: "v".to_string(),
            generated_at: "t".to_string(),
            artifact_count: 2,
            artifacts: vec![
                Artifact {
                    path: "csv/brands.csv".to_string(),
                    sha256: String::new(),
                    size: 10,
                },
                Artifact {
                    path: "json/all.json".to_string(),
                    sha256: String::new(),
                    size: 2048,
                },
            ],
        };
        let lines = format_export_inventory(&manifest, Path::new("dist"));
        assert_eq!(lines[0], "Exported 2 files to dist");
        assert_eq!(lines[1], "    csv/brands.csv  10 B");
        assert_eq!(lines[2], "    json/all.json   2.0 KiB");
    }

    #[test]
    fn script_list_shows_key_args() {
        let scripts = [ScriptEntry {
            name: "style_data",
            description: "Sort keys",
            key_args: &["--dry-run"],
            run: noop,
        }];
        assert_eq!(format_script_list(&scripts), ["style_data  Sort keys", "    --dry-run"]);
    }

    #[test]
    fn script_outcome_lists_stats() {
        let mut data = Map::new();
        data.insert("stats".to_string(), json!({"files_processed": 3, "files_modified": 1}));
        let outcome = ScriptOutcome {
            success: false,
            message: "Validation failed: 2 errors".to_string(),
            data,
        };
        assert_eq!(
            format_script_outcome("style_data", &outcome),
            [
                "style_data FAILED: Validation failed: 2 errors",
                "    files_processed: 3",
                "    files_modified: 1",
            ]
        );
    }
}
