//! # ofd
//!
//! Toolchain for the Open Filament Database, a community dataset of 3D
//! printing filaments. The filesystem is the source of truth: every brand,
//! material, filament, color variant and store is a directory holding one
//! JSON manifest, and every entity gets a deterministic UUIDv5.
//!
//! # Architecture
//!
//! Two independent consumers read the same source trees:
//!
//! ```text
//! data/ + stores/ ──► crawl ──► Database ──► export ──► dist/ + manifest.json
//!                 └─► validate ──► ValidationResult
//! ```
//!
//! The crawler normalizes what it can and records the rest as issues. The
//! validators look at the raw files, so they also catch what the crawler
//! silently skipped. Neither step turns a data problem into an `Err`:
//! problems become [`report::Issue`]s, and only missing roots or unusable
//! schemas abort a run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ids`] | UUIDv5 namespaces and per-entity derivation formulas |
//! | [`model`] | Entity records, value objects, the [`model::Database`] aggregate, column tables |
//! | [`naming`] | Slugs, folder-name cleansing, color hex normalization |
//! | [`layout`] | Source tree levels and deterministic directory walking |
//! | [`report`] | Leveled issues shared by crawl and validation |
//! | [`crawl`] | Two-pass crawl of the stores and data trees |
//! | [`validate`] | Schema cache, six validators, parallel orchestrator |
//! | [`export`] | JSON, NDJSON, CSV, SQLite and static API exporters plus the checksum manifest |
//! | [`scripts`] | Static registry of maintenance scripts (`style_data`) |
//! | [`config`] | `ofd.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Deterministic IDs
//!
//! IDs are derived, never stored. A brand ID hashes the brand directory name,
//! a variant ID hashes its filament ID and color name, and so on down to
//! purchase links. Namespaces are published constants, so any consumer can
//! recompute an ID without the dataset.
//!
//! ## Stores Before Data
//!
//! The crawler reads stores first so purchase links can be checked against
//! known store IDs while sizes are read. Unknown references are warnings and
//! the link is dropped.
//!
//! ## Sorted Traversal
//!
//! Directories are visited in lexicographic order and validation results are
//! merged in task order, so output is identical for one worker or many.

pub mod config;
pub mod crawl;
pub mod export;
pub mod ids;
pub mod layout;
pub mod model;
pub mod naming;
pub mod output;
pub mod report;
pub mod scripts;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
