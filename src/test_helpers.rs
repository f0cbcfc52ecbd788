//! Shared test utilities for the ofd test suite.
//!
//! Provides fixture setup, tree builders, and lookup helpers over crawl and
//! validation output.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let (db, result) = crawl(&tmp.path().join("data"), &tmp.path().join("stores")).unwrap();
//!
//! let brand = find_brand(&db, "Prusament");
//! assert_eq!(brand.origin, "CZ");
//! assert_eq!(find_issue(&result, "Missing File").message, "Missing brand.json");
//! ```

use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

use crate::ids;
use crate::model::{Brand, Database, Store, Variant};
use crate::report::{Issue, Report};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` and `schemas/` to a temp directory and return it.
///
/// The copy also gets generated logos: a square one for the brand and the
/// Prusa store, and a 300x200 one for `filament_shop`.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    copy_dir_recursive(&root.join("fixtures"), tmp.path()).unwrap();
    std::fs::create_dir_all(tmp.path().join("schemas")).unwrap();
    copy_dir_recursive(&root.join("schemas"), &tmp.path().join("schemas")).unwrap();

    write_png(&tmp.path().join("data/Prusament/logo.png"), 200, 200);
    write_png(&tmp.path().join("stores/prusa_store/logo.png"), 200, 200);
    write_png(&tmp.path().join("stores/filament_shop/logo.png"), 300, 200);
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Tree builders
// =========================================================================

/// Write pretty JSON, creating parent directories.
pub fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Write a solid-color PNG of the given size, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 102, 0]));
    img.save(path).unwrap();
}

// =========================================================================
// Sample entities
// =========================================================================

pub fn sample_brand() -> Brand {
    Brand {
        id: ids::brand_id("Prusament"),
        name: "Prusament".to_string(),
        slug: "prusament".to_string(),
        directory_name: "Prusament".to_string(),
        website: "https://prusament.com".to_string(),
        logo: "logo.png".to_string(),
        origin: "CZ".to_string(),
    }
}

pub fn sample_store() -> Store {
    Store {
        id: ids::store_id("prusa_store"),
        name: "Prusa Store".to_string(),
        slug: "prusa-store".to_string(),
        directory_name: "prusa_store".to_string(),
        storefront_url: "https://www.prusa3d.com".to_string(),
        logo: "logo.png".to_string(),
        ships_from: vec!["CZ".to_string()],
        ships_to: vec!["DE".to_string(), "CZ".to_string()],
    }
}

// =========================================================================
// Lookups: panic with the available names on a miss
// =========================================================================

/// Find a brand by name. Panics if not found.
pub fn find_brand<'a>(db: &'a Database, name: &str) -> &'a Brand {
    db.brands.iter().find(|b| b.name == name).unwrap_or_else(|| {
        let names: Vec<&str> = db.brands.iter().map(|b| b.name.as_str()).collect();
        panic!("brand '{name}' not found. Available: {names:?}")
    })
}

/// Find a variant by color name. Panics if not found.
pub fn find_variant<'a>(db: &'a Database, color_name: &str) -> &'a Variant {
    db.variants
        .iter()
        .find(|v| v.color_name == color_name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = db.variants.iter().map(|v| v.color_name.as_str()).collect();
            panic!("variant '{color_name}' not found. Available: {names:?}")
        })
}

/// Find a store by name. Panics if not found.
pub fn find_store<'a>(db: &'a Database, name: &str) -> &'a Store {
    db.stores.iter().find(|s| s.name == name).unwrap_or_else(|| {
        let names: Vec<&str> = db.stores.iter().map(|s| s.name.as_str()).collect();
        panic!("store '{name}' not found. Available: {names:?}")
    })
}

/// First issue of a category. Panics if none.
pub fn find_issue<'a>(report: &'a Report, category: &str) -> &'a Issue {
    report
        .errors
        .iter()
        .find(|e| e.category == category)
        .unwrap_or_else(|| {
            let categories: Vec<&str> = report.errors.iter().map(|e| e.category.as_str()).collect();
            panic!("no '{category}' issue. Available: {categories:?}")
        })
}

/// Ids of all sizes belonging to a variant, in crawl order.
pub fn size_ids_of(db: &Database, variant_id: Uuid) -> Vec<Uuid> {
    db.sizes
        .iter()
        .filter(|s| s.variant_id == variant_id)
        .map(|s| s.id)
        .collect()
}
