//! Leveled diagnostic records shared by the crawler and the validators.
//!
//! Both the crawl ([`BuildResult`]) and validation ([`ValidationResult`])
//! produce an ordered list of [`Issue`]s. Only [`Level::Error`] records fail a
//! run; warnings are informational.
//!
//! Display format of a single issue:
//!
//! ```text
//! ERROR - Missing File: Missing brand.json [data/Prusament]
//! WARNING - Invalid Reference: Unknown store_id 'x' at [0].purchase_links[1] [.../sizes.json]
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Error,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => f.write_str("ERROR"),
            Level::Warning => f.write_str("WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub level: Level,
    pub category: String,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl Issue {
    pub fn error(category: &str, message: impl Into<String>, path: Option<&Path>) -> Self {
        Self::new(Level::Error, category, message, path)
    }

    pub fn warning(category: &str, message: impl Into<String>, path: Option<&Path>) -> Self {
        Self::new(Level::Warning, category, message, path)
    }

    fn new(level: Level, category: &str, message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            level,
            category: category.to_string(),
            message: message.into(),
            path: path.map(Path::to_path_buf),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}: {}", self.level, self.category, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " [{}]", path.display())?;
        }
        Ok(())
    }
}

/// Ordered collection of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub errors: Vec<Issue>,
}

/// Issues collected while crawling.
pub type BuildResult = Report;
/// Issues collected while validating.
pub type ValidationResult = Report;

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.errors.push(issue);
    }

    pub fn add_error(&mut self, category: &str, message: impl Into<String>, path: Option<&Path>) {
        self.push(Issue::error(category, message, path));
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>, path: Option<&Path>) {
        self.push(Issue::warning(category, message, path));
    }

    pub fn merge(&mut self, other: Report) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.level == Level::Error)
    }

    /// True iff no ERROR-level issue exists.
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.level == Level::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.errors.iter().filter(|e| e.level == Level::Warning).count()
    }

    /// Issues grouped by category, categories in sorted order, issues in
    /// their original order within a category.
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Issue>> {
        let mut groups: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.errors {
            groups.entry(issue.category.as_str()).or_default().push(issue);
        }
        groups
    }

    /// Machine-readable summary used by `validate --json`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "errors": self.errors,
            "error_count": self.error_count(),
            "warning_count": self.warning_count(),
            "is_valid": self.is_valid(),
        })
    }
}

impl FromIterator<Issue> for Report {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}
