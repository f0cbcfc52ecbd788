//! `style_data`: rewrite manifests so their keys follow schema order.
//!
//! Key order comes from each schema's `properties`, descending into nested
//! objects, array items and local `#/definitions/...` references. Keys a
//! schema does not declare are kept, moved to the end in alphabetical order
//! and reported. Objects the schema leaves free-form (no `properties`) are
//! written back untouched.
//!
//! Files are rewritten with 2-space indentation and a trailing newline, and
//! only when the key order actually changes. `--fix-indent-only` skips
//! sorting and re-indents every JSON file under the data and stores roots.

use super::{ScriptContext, ScriptError, ScriptOutcome};
use crate::layout::{self, Level, SIZES_FILE};
use crate::validate::Orchestrator;
use crate::validate::schema::SchemaCache;
use clap::Parser;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const MAX_DEPTH: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "ofd script style_data", about = "Sort JSON keys according to schema definitions")]
struct Args {
    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,
    /// Run validation afterwards when files changed
    #[arg(long)]
    validate: bool,
    /// Only normalize indentation of every JSON file
    #[arg(long)]
    fix_indent_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StyleStats {
    pub files_processed: usize,
    pub files_modified: usize,
    pub files_skipped: usize,
    pub extra_keys_found: usize,
}

// ============================================================================
// Key order
// ============================================================================

/// Declared key order of an object schema and of its nested objects.
///
/// For array-valued properties the order applies to the items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOrder {
    pub keys: Vec<String>,
    pub children: HashMap<String, KeyOrder>,
}

impl KeyOrder {
    /// Key order of the schema document `root`.
    pub fn from_schema(root: &Value) -> Self {
        Self::of_node(root, root, 0)
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn of_node(root: &Value, node: &Value, depth: usize) -> Self {
        if depth > MAX_DEPTH {
            return Self::default();
        }
        let node = resolve(root, node);

        if let Some(items) = node.get("items") {
            return Self::of_node(root, items, depth + 1);
        }

        if let Some(properties) = node.get("properties").and_then(Value::as_object) {
            let mut order = Self::default();
            for (key, sub) in properties {
                order.keys.push(key.clone());
                let child = Self::of_node(root, sub, depth + 1);
                if !child.is_empty() {
                    order.children.insert(key.clone(), child);
                }
            }
            return order;
        }

        // First alternative that describes an object.
        for combinator in ["oneOf", "anyOf", "allOf"] {
            if let Some(alternatives) = node.get(combinator).and_then(Value::as_array) {
                for alternative in alternatives {
                    let order = Self::of_node(root, alternative, depth + 1);
                    if !order.is_empty() {
                        return order;
                    }
                }
            }
        }
        Self::default()
    }
}

/// Follow local `$ref`s (`#/...`) to the node they point at.
fn resolve<'a>(root: &'a Value, mut node: &'a Value) -> &'a Value {
    for _ in 0..MAX_DEPTH {
        let Some(pointer) = node
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| r.strip_prefix('#'))
        else {
            break;
        };
        match root.pointer(pointer) {
            Some(target) => node = target,
            None => break,
        }
    }
    node
}

/// `value` with object keys in `order`; undeclared keys are appended sorted
/// and collected into `extra`.
pub fn sort_keys(value: &Value, order: &KeyOrder, extra: &mut BTreeSet<String>) -> Value {
    match value {
        Value::Object(map) if !order.is_empty() => {
            let mut sorted = Map::new();
            for key in &order.keys {
                if let Some(v) = map.get(key) {
                    let v = match order.children.get(key) {
                        Some(child) => sort_keys(v, child, extra),
                        None => v.clone(),
                    };
                    sorted.insert(key.clone(), v);
                }
            }
            let mut unknown: Vec<&String> =
                map.keys().filter(|k| !sorted.contains_key(*k)).collect();
            unknown.sort();
            for key in unknown {
                extra.insert(key.clone());
                sorted.insert(key.clone(), map[key].clone());
            }
            Value::Object(sorted)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|i| sort_keys(i, order, extra)).collect())
        }
        other => other.clone(),
    }
}

fn pretty(value: &Value) -> Result<String, ScriptError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn read_document(path: &Path) -> Option<(String, Value)> {
    let text = fs::read_to_string(path)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "unreadable"))
        .ok()?;
    let value = serde_json::from_str(&text)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "invalid JSON"))
        .ok()?;
    Some((text, value))
}

// ============================================================================
// Passes
// ============================================================================

/// Every manifest under the two roots paired with the schema it follows.
fn manifests(data_dir: &Path, stores_dir: &Path) -> std::io::Result<Vec<(PathBuf, &'static str)>> {
    let mut files = Vec::new();
    let dirs = layout::data_dirs(data_dir)?
        .into_iter()
        .chain(layout::store_dirs(stores_dir)?);
    for dir in dirs {
        let manifest = dir.manifest_path();
        if manifest.is_file() {
            files.push((manifest, dir.level.schema()));
        }
        let sizes = dir.path.join(SIZES_FILE);
        if dir.level == Level::Variant && sizes.is_file() {
            files.push((sizes, "sizes"));
        }
    }
    Ok(files)
}

/// Sort one file, returning whether it changed.
fn style_file(
    path: &Path,
    order: &KeyOrder,
    dry_run: bool,
    stats: &mut StyleStats,
) -> Result<bool, ScriptError> {
    let Some((_, value)) = read_document(path) else {
        stats.files_skipped += 1;
        return Ok(false);
    };

    let mut extra = BTreeSet::new();
    let sorted = sort_keys(&value, order, &mut extra);
    if !extra.is_empty() {
        warn!(path = %path.display(), keys = ?extra, "keys not declared in schema");
        stats.extra_keys_found += extra.len();
    }
    stats.files_processed += 1;

    if serde_json::to_string(&value)? == serde_json::to_string(&sorted)? {
        return Ok(false);
    }
    if dry_run {
        info!(path = %path.display(), "would sort");
    } else {
        fs::write(path, pretty(&sorted)?)?;
        info!(path = %path.display(), "sorted");
    }
    stats.files_modified += 1;
    Ok(true)
}

/// Sort every manifest against its schema.
pub fn sort_tree(
    ctx: &ScriptContext,
    schemas: &SchemaCache,
    dry_run: bool,
) -> Result<StyleStats, ScriptError> {
    let mut orders: HashMap<&str, KeyOrder> = HashMap::new();
    let mut stats = StyleStats::default();

    for (path, schema) in manifests(&ctx.data_dir, &ctx.stores_dir)? {
        if !orders.contains_key(schema) {
            let Some(document) = schemas.get(schema) else {
                warn!(schema, "no schema loaded");
                stats.files_skipped += 1;
                continue;
            };
            orders.insert(schema, KeyOrder::from_schema(document));
        }
        style_file(&path, &orders[schema], dry_run, &mut stats)?;
    }
    Ok(stats)
}

/// Re-indent every `.json` under the data and stores roots.
pub fn fix_indentation(ctx: &ScriptContext, dry_run: bool) -> Result<StyleStats, ScriptError> {
    let mut stats = StyleStats::default();
    for root in [&ctx.data_dir, &ctx.stores_dir] {
        if !root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some((original, value)) = read_document(path) else {
                stats.files_skipped += 1;
                continue;
            };
            stats.files_processed += 1;

            let text = pretty(&value)?;
            if text == original {
                continue;
            }
            if dry_run {
                info!(path = %path.display(), "would fix indentation");
            } else {
                fs::write(path, text)?;
                info!(path = %path.display(), "fixed indentation");
            }
            stats.files_modified += 1;
        }
    }
    Ok(stats)
}

pub fn run(ctx: &ScriptContext, args: &[String]) -> Result<ScriptOutcome, ScriptError> {
    let argv = std::iter::once("style_data".to_string()).chain(args.iter().cloned());
    let args = Args::try_parse_from(argv).map_err(|e| ScriptError::Usage(e.to_string()))?;

    let mut data = Map::new();
    data.insert("dry_run".to_string(), Value::Bool(args.dry_run));

    if args.fix_indent_only {
        let stats = fix_indentation(ctx, args.dry_run)?;
        data.insert("mode".to_string(), Value::from("fix_indent_only"));
        data.insert("stats".to_string(), serde_json::to_value(stats)?);
        return Ok(ScriptOutcome {
            success: true,
            message: "Indentation fix complete".to_string(),
            data,
        });
    }

    let schemas = SchemaCache::load(&ctx.schemas_dir)?;
    let stats = sort_tree(ctx, &schemas, args.dry_run)?;
    data.insert("stats".to_string(), serde_json::to_value(stats)?);

    if args.validate && !args.dry_run && stats.files_modified > 0 {
        let result = Orchestrator::new(&ctx.data_dir, &ctx.stores_dir, &schemas, ctx.workers)?
            .validate_all()?;
        data.insert("validation".to_string(), result.to_json());
        if !result.is_valid() {
            return Ok(ScriptOutcome {
                success: false,
                message: format!("Validation failed: {} errors", result.error_count()),
                data,
            });
        }
    }

    Ok(ScriptOutcome {
        success: true,
        message: "Sorting complete".to_string(),
        data,
    })
}
