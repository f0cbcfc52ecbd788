//! Source tree crawler.
//!
//! Turns the `data/` and `stores/` trees into a [`Database`] plus a
//! [`BuildResult`] of everything that was skipped along the way.
//!
//! ## Passes
//!
//! 1. **Stores**: every `stores/<dir>/store.json`. The store's declared `id`
//!    is cached against its derived UUID so purchase links can resolve it.
//! 2. **Data**: brand → material → filament → variant, each level reading its
//!    manifest, then `sizes.json` per variant for sizes and purchase links.
//!
//! ## Failure Policy
//!
//! | Condition | Outcome |
//! |---|---|
//! | data root missing | `Err(CrawlError::MissingRoot)`, nothing crawled |
//! | stores root missing | WARNING `Directory`, data pass still runs |
//! | manifest missing | WARNING `Missing File`, subtree skipped |
//! | manifest unparseable | WARNING `JSON Parse`, subtree skipped |
//! | `sizes.json` missing | WARNING `Missing File`, variant kept |
//! | size without `filament_weight` | WARNING `Missing Field`, siblings kept |
//! | purchase link to unknown store | WARNING `Invalid Reference`, size kept |
//!
//! The crawl is sequential; traversal order is the output order.

pub mod documents;

use crate::ids;
use crate::layout::{self, Level, SIZES_FILE};
use crate::model::{
    Brand, Database, Filament, Material, PurchaseLink, Size, Store, Variant,
};
use crate::naming::{normalize_color_hex, slugify};
use crate::report::BuildResult;
use documents::{
    BrandDoc, FilamentDoc, MaterialDoc, OneOrMany, SizeDoc, StoreDoc, VariantDoc,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_DENSITY: f64 = 1.24;
const DEFAULT_DIAMETER_TOLERANCE: f64 = 0.02;
const DEFAULT_DIAMETER: f64 = 1.75;
const DEFAULT_COLOR_HEX: &str = "#000000";
const UNKNOWN_ORIGIN: &str = "Unknown";

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("data directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crawl both source trees.
pub fn crawl(data_dir: &Path, stores_dir: &Path) -> Result<(Database, BuildResult), CrawlError> {
    if !data_dir.is_dir() {
        return Err(CrawlError::MissingRoot(data_dir.to_path_buf()));
    }
    let mut crawler = Crawler::default();
    crawler.crawl_stores(stores_dir)?;
    crawler.crawl_data(data_dir)?;

    for (collection, count) in crawler.db.stats() {
        info!(collection, count, "crawled");
    }
    Ok((crawler.db, crawler.result))
}

#[derive(Default)]
struct Crawler {
    db: Database,
    result: BuildResult,
    /// `brand_id:material dir` → material id.
    materials: HashMap<String, Uuid>,
    /// Declared store id → derived store id.
    stores: HashMap<String, Uuid>,
}

impl Crawler {
    // ------------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------------

    fn crawl_stores(&mut self, stores_dir: &Path) -> Result<(), CrawlError> {
        if !stores_dir.is_dir() {
            self.result.add_warning(
                "Directory",
                "Stores directory does not exist",
                Some(stores_dir),
            );
            return Ok(());
        }
        for dir in layout::store_dirs(stores_dir)? {
            self.process_store(&dir.path);
        }
        Ok(())
    }

    fn process_store(&mut self, dir: &Path) {
        let Some(mut doc) = self.read_manifest::<StoreDoc>(dir, Level::Store) else {
            return;
        };
        let manifest = dir.join(Level::Store.manifest());
        let Some(declared) = doc.id.take().filter(|id| !id.is_empty()) else {
            self.result
                .add_warning("Missing Field", "Store missing 'id' field", Some(&manifest));
            return;
        };

        let id = ids::store_id(&declared);
        let directory_name = layout::dir_name(dir);
        let name = doc.name.take().unwrap_or_else(|| directory_name.clone());
        let store = Store {
            id,
            slug: slugify(&name),
            name,
            directory_name,
            storefront_url: doc.storefront_url.take().unwrap_or_default(),
            logo: doc.logo.take().unwrap_or_default(),
            ships_from: doc.ships_from(),
            ships_to: doc.ships_to(),
        };
        debug!(store = %store.name, %id, "store");
        self.db.stores.push(store);
        self.stores.insert(declared, id);
    }

    // ------------------------------------------------------------------------
    // Data tree
    // ------------------------------------------------------------------------

    fn crawl_data(&mut self, data_dir: &Path) -> Result<(), CrawlError> {
        for dir in layout::subdirectories(data_dir)? {
            self.process_brand(&dir)?;
        }
        Ok(())
    }

    fn process_brand(&mut self, dir: &Path) -> Result<(), CrawlError> {
        let Some(doc) = self.read_manifest::<BrandDoc>(dir, Level::Brand) else {
            return Ok(());
        };
        let directory_name = layout::dir_name(dir);
        let id = ids::brand_id(&directory_name);
        self.db.brands.push(Brand {
            id,
            name: doc.name.unwrap_or_else(|| directory_name.clone()),
            slug: slugify(&directory_name),
            directory_name,
            website: doc.website.unwrap_or_default(),
            logo: doc.logo.unwrap_or_default(),
            origin: doc.origin.unwrap_or_else(|| UNKNOWN_ORIGIN.to_string()),
        });

        for material_dir in layout::subdirectories(dir)? {
            self.process_material(&material_dir, id)?;
        }
        Ok(())
    }

    fn process_material(&mut self, dir: &Path, brand_id: Uuid) -> Result<(), CrawlError> {
        let Some(doc) = self.read_manifest::<MaterialDoc>(dir, Level::Material) else {
            return Ok(());
        };
        let material_name = layout::dir_name(dir);
        let id = ids::material_id(brand_id, &material_name);
        let cache_key = format!("{brand_id}:{material_name}");

        if !self.materials.contains_key(&cache_key) {
            self.db.materials.push(Material {
                id,
                brand_id,
                material: doc.material.unwrap_or_else(|| material_name.clone()),
                slug: slugify(&material_name),
                default_max_dry_temperature: doc.default_max_dry_temperature,
                default_slicer_settings: doc.default_slicer_settings.map(Into::into),
            });
            self.materials.insert(cache_key, id);
        }

        for filament_dir in layout::subdirectories(dir)? {
            self.process_filament(&filament_dir, brand_id, id, &material_name)?;
        }
        Ok(())
    }

    fn process_filament(
        &mut self,
        dir: &Path,
        brand_id: Uuid,
        material_id: Uuid,
        material_name: &str,
    ) -> Result<(), CrawlError> {
        let Some(doc) = self.read_manifest::<FilamentDoc>(dir, Level::Filament) else {
            return Ok(());
        };
        let name = doc.name.unwrap_or_else(|| layout::dir_name(dir));
        let id = ids::filament_id(brand_id, material_id, &name);
        self.db.filaments.push(Filament {
            id,
            brand_id,
            material_id,
            slug: slugify(&name),
            name,
            material: material_name.to_string(),
            density: doc.density.unwrap_or(DEFAULT_DENSITY),
            diameter_tolerance: doc.diameter_tolerance.unwrap_or(DEFAULT_DIAMETER_TOLERANCE),
            max_dry_temperature: doc.max_dry_temperature,
            data_sheet_url: doc.data_sheet_url,
            safety_sheet_url: doc.safety_sheet_url,
            discontinued: doc.discontinued.unwrap_or(false),
            slicer_ids: doc.slicer_ids.map(Into::into),
            slicer_settings: doc.slicer_settings.map(Into::into),
        });

        for variant_dir in layout::subdirectories(dir)? {
            self.process_variant(&variant_dir, id);
        }
        Ok(())
    }

    fn process_variant(&mut self, dir: &Path, filament_id: Uuid) {
        let Some(doc) = self.read_manifest::<VariantDoc>(dir, Level::Variant) else {
            return;
        };
        let color_name = doc.color_name.unwrap_or_else(|| layout::dir_name(dir));
        let id = ids::variant_id(filament_id, &color_name);
        self.db.variants.push(Variant {
            id,
            filament_id,
            slug: slugify(&color_name),
            color_name,
            color_hex: primary_color(doc.color_hex),
            hex_variants: doc.hex_variants.map(|hexes| {
                hexes
                    .iter()
                    .filter_map(|h| normalize_color_hex(h))
                    .collect()
            }),
            color_standards: doc.color_standards.map(Into::into),
            traits: doc.traits.map(Into::into),
            discontinued: doc.discontinued.unwrap_or(false),
        });

        let sizes = dir.join(SIZES_FILE);
        if sizes.is_file() {
            self.process_sizes(&sizes, id);
        } else {
            self.result
                .add_warning("Missing File", format!("Missing {SIZES_FILE}"), Some(dir));
        }
    }

    // ------------------------------------------------------------------------
    // Sizes and purchase links
    // ------------------------------------------------------------------------

    fn process_sizes(&mut self, path: &Path, variant_id: Uuid) {
        let entries = match self.read_json::<Value>(path) {
            Some(Value::Array(items)) => items,
            Some(single @ Value::Object(_)) => vec![single],
            Some(_) => {
                self.result.add_warning(
                    "JSON Parse",
                    "Sizes file must hold an object or a list of objects",
                    Some(path),
                );
                return;
            }
            None => return,
        };
        for (index, entry) in entries.into_iter().enumerate() {
            let Value::Object(raw) = entry else {
                self.result.add_warning(
                    "JSON Parse",
                    format!("Size entry [{index}] is not an object"),
                    Some(path),
                );
                continue;
            };
            self.create_size(raw, variant_id, index, path);
        }
    }

    fn create_size(
        &mut self,
        raw: Map<String, Value>,
        variant_id: Uuid,
        index: usize,
        path: &Path,
    ) {
        let id = ids::size_id(variant_id, &raw, index);
        let doc: SizeDoc = match serde_json::from_value(Value::Object(raw)) {
            Ok(doc) => doc,
            Err(e) => {
                self.result.add_warning(
                    "JSON Parse",
                    format!("Size entry [{index}] is malformed: {e}"),
                    Some(path),
                );
                return;
            }
        };
        let Some(weight) = doc.filament_weight else {
            self.result.add_warning(
                "Missing Field",
                format!("Size entry [{index}] missing filament_weight"),
                Some(path),
            );
            return;
        };

        let diameter = doc
            .diameter
            .filter(|d| *d != 0.0)
            .unwrap_or(DEFAULT_DIAMETER);
        let gtin = non_empty(doc.gtin).or_else(|| non_empty(doc.ean));
        self.db.sizes.push(Size {
            id,
            variant_id,
            filament_weight: weight as i64,
            diameter,
            empty_spool_weight: doc.empty_spool_weight,
            spool_core_diameter: doc.spool_core_diameter,
            gtin,
            article_number: doc.article_number,
            barcode_identifier: doc.barcode_identifier,
            nfc_identifier: doc.nfc_identifier,
            qr_identifier: doc.qr_identifier,
            discontinued: doc.discontinued.unwrap_or(false),
        });

        for (link_index, mut link) in doc.purchase_links.into_iter().enumerate() {
            let location = format!("[{index}].purchase_links[{link_index}]");
            let (Some(declared), Some(url)) =
                (non_empty(link.store_id.take()), non_empty(link.url.take()))
            else {
                self.result.add_warning(
                    "Missing Field",
                    format!("Purchase link {location} missing store_id or url"),
                    Some(path),
                );
                continue;
            };
            let Some(&store_id) = self.stores.get(&declared) else {
                self.result.add_warning(
                    "Invalid Reference",
                    format!("Unknown store_id '{declared}' at {location}"),
                    Some(path),
                );
                continue;
            };
            self.db.purchase_links.push(PurchaseLink {
                id: ids::purchase_link_id(id, store_id, &url),
                size_id: id,
                store_id,
                spool_refill: link.spool_refill.unwrap_or(false),
                ships_from: link.ships_from(),
                ships_to: link.ships_to(),
                url,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Read the manifest of `dir`, recording a warning when it is absent or
    /// unreadable.
    fn read_manifest<T: DeserializeOwned>(&mut self, dir: &Path, level: Level) -> Option<T> {
        let manifest = dir.join(level.manifest());
        if !manifest.is_file() {
            self.result.add_warning(
                "Missing File",
                format!("Missing {}", level.manifest()),
                Some(dir),
            );
            return None;
        }
        self.read_json(&manifest)
    }

    fn read_json<T: DeserializeOwned>(&mut self, path: &Path) -> Option<T> {
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(doc) => Some(doc),
            Err(e) => {
                self.result
                    .add_warning("JSON Parse", format!("Failed to parse: {e}"), Some(path));
                None
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// First declared color, normalized; black when nothing usable is declared.
fn primary_color(declared: Option<OneOrMany<String>>) -> String {
    declared
        .and_then(|hex| hex.into_vec().into_iter().next())
        .and_then(|hex| normalize_color_hex(&hex))
        .unwrap_or_else(|| DEFAULT_COLOR_HEX.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Level as IssueLevel;
    use crate::test_helpers::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// One brand, one material, one filament, one variant, one store.
    fn minimal_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_json(&root.join("stores/prusa_store/store.json"), &json!({
            "id": "prusa_store",
            "name": "Prusa Store",
            "storefront_url": "https://www.prusa3d.com",
            "logo": "logo.png",
            "ships_from": "CZ",
            "ships_to": ["CZ", "DE"]
        }));
        let brand = root.join("data/Prusament");
        write_json(&brand.join("brand.json"), &json!({
            "id": "Prusament", "name": "Prusament", "origin": "CZ"
        }));
        write_json(&brand.join("PLA/material.json"), &json!({"material": "PLA"}));
        let filament = brand.join("PLA/Prusament PLA");
        write_json(&filament.join("filament.json"), &json!({
            "id": "Prusament PLA", "name": "Prusament PLA", "density": 1.24
        }));
        let variant = filament.join("Galaxy Black");
        write_json(&variant.join("variant.json"), &json!({
            "id": "Galaxy Black", "color_name": "Galaxy Black", "color_hex": "3d3e3d"
        }));
        write_json(&variant.join("sizes.json"), &json!([{
            "filament_weight": 1000,
            "diameter": 1.75,
            "gtin": "8594173675179",
            "purchase_links": [{
                "store_id": "prusa_store",
                "url": "https://www.prusa3d.com/product/prusament-pla-galaxy-black-1kg/"
            }]
        }]));
        tmp
    }

    fn crawl_tree(tmp: &TempDir) -> (Database, BuildResult) {
        crawl(&tmp.path().join("data"), &tmp.path().join("stores")).unwrap()
    }

    fn sizes_path(tmp: &TempDir) -> PathBuf {
        tmp.path()
            .join("data/Prusament/PLA/Prusament PLA/Galaxy Black/sizes.json")
    }

    // =========================================================================
    // Happy path
    // =========================================================================

    #[test]
    fn crawls_full_hierarchy() {
        let tmp = minimal_tree();
        let (db, result) = crawl_tree(&tmp);
        assert!(result.is_empty(), "{:?}", result.errors);
        assert_eq!(db.stats().map(|(_, n)| n), [1, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn ids_match_published_values() {
        let tmp = minimal_tree();
        let (db, _) = crawl_tree(&tmp);
        assert_eq!(db.brands[0].id.to_string(), "ae5ff34e-298e-50c9-8f77-92a97fb30b09");
        assert_eq!(db.materials[0].id.to_string(), "8861325c-1c16-560c-83b3-195ef25afd43");
        assert_eq!(db.filaments[0].id.to_string(), "39dc7dbb-5500-58e5-9815-dc537fefd632");
        assert_eq!(db.variants[0].id.to_string(), "ba8d0917-ff22-513b-970c-ad939e57122e");
        assert_eq!(db.sizes[0].id.to_string(), "9c795b0d-f1cb-59ca-8b8e-9634c6b99f52");
        assert_eq!(db.stores[0].id.to_string(), "7565ddde-6c80-5f20-b473-d73210d55443");
        assert_eq!(
            db.purchase_links[0].id.to_string(),
            "27f32eda-2210-5990-9655-85185160b3f3"
        );
    }

    #[test]
    fn recrawl_is_identical() {
        let tmp = minimal_tree();
        let (first, _) = crawl_tree(&tmp);
        let (second, _) = crawl_tree(&tmp);
        assert_eq!(first, second);
    }

    #[test]
    fn references_resolve() {
        let tmp = minimal_tree();
        let (db, _) = crawl_tree(&tmp);
        let link = &db.purchase_links[0];
        assert_eq!(link.store_id, db.stores[0].id);
        assert_eq!(link.size_id, db.sizes[0].id);
        assert_eq!(db.filaments[0].material_id, db.materials[0].id);
        assert_eq!(db.filaments[0].material, "PLA");
    }

    #[test]
    fn defaults_and_normalization() {
        let tmp = minimal_tree();
        let (db, _) = crawl_tree(&tmp);
        let brand = find_brand(&db, "Prusament");
        assert_eq!(brand.website, "");
        assert_eq!(brand.directory_name, "Prusament");
        assert_eq!(db.filaments[0].diameter_tolerance, 0.02);
        assert_eq!(db.variants[0].color_hex, "#3D3E3D");
        assert_eq!(db.variants[0].slug, "galaxy-black");
        assert_eq!(db.stores[0].ships_from, ["CZ"]);
        assert_eq!(db.stores[0].slug, "prusa-store");
        assert!(db.variants[0].traits.is_none());
    }

    #[test]
    fn color_array_takes_first_element() {
        let tmp = minimal_tree();
        let variant = tmp
            .path()
            .join("data/Prusament/PLA/Prusament PLA/Galaxy Black/variant.json");
        write_json(&variant, &json!({
            "color_name": "Galaxy Black",
            "color_hex": ["#ff0000", "#00FF00"],
            "hex_variants": ["f00", "", "00ff00"],
            "traits": {"glow": true}
        }));
        let (db, _) = crawl_tree(&tmp);
        let v = find_variant(&db, "Galaxy Black");
        assert_eq!(v.color_hex, "#FF0000");
        assert_eq!(
            v.hex_variants.as_deref(),
            Some(&["#FF0000".to_string(), "#00FF00".to_string()][..])
        );
        let traits = v.traits.unwrap();
        assert!(traits.glow && !traits.matte);
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    #[test]
    fn identical_size_entries_get_distinct_ids() {
        let tmp = minimal_tree();
        let entry = json!({"filament_weight": 1000, "diameter": 1.75});
        write_json(&sizes_path(&tmp), &json!([entry.clone(), entry]));
        let (db, _) = crawl_tree(&tmp);
        let ids = size_ids_of(&db, find_variant(&db, "Galaxy Black").id);
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn missing_weight_skips_only_that_entry() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([
            {"diameter": 1.75},
            {"filament_weight": 500}
        ]));
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.sizes.len(), 1);
        assert_eq!(db.sizes[0].filament_weight, 500);
        assert_eq!(result.warning_count(), 1);
        let issue = find_issue(&result, "Missing Field");
        assert_eq!(issue.message, "Size entry [0] missing filament_weight");
    }

    #[test]
    fn zero_or_missing_diameter_defaults() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([
            {"filament_weight": 1000, "diameter": 0},
            {"filament_weight": 1000},
            {"filament_weight": 1000, "diameter": 2.85}
        ]));
        let (db, _) = crawl_tree(&tmp);
        let diameters: Vec<f64> = db.sizes.iter().map(|s| s.diameter).collect();
        assert_eq!(diameters, [1.75, 1.75, 2.85]);
    }

    #[test]
    fn ean_fills_missing_gtin() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([
            {"filament_weight": 1000, "ean": "4006381333931"}
        ]));
        let (db, _) = crawl_tree(&tmp);
        assert_eq!(db.sizes[0].gtin.as_deref(), Some("4006381333931"));
    }

    #[test]
    fn every_entry_of_a_sizes_list_is_crawled() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([
            {
                "filament_weight": 1000,
                "purchase_links": [{"store_id": "prusa_store", "url": "https://example.com/1kg"}]
            },
            {
                "filament_weight": 2000,
                "purchase_links": [{"store_id": "prusa_store", "url": "https://example.com/2kg"}]
            }
        ]));
        let (db, result) = crawl_tree(&tmp);
        assert!(result.is_empty(), "{:?}", result.errors);
        assert_eq!(db.sizes.len(), 2);
        assert_eq!(db.sizes[1].filament_weight, 2000);
        assert_eq!(db.purchase_links.len(), 2);
        assert_eq!(db.purchase_links[0].size_id, db.sizes[0].id);
        assert_eq!(db.purchase_links[1].size_id, db.sizes[1].id);
        assert_eq!(db.purchase_links[1].url, "https://example.com/2kg");
    }

    #[test]
    fn fixture_tree_yields_every_size_and_link() {
        let tmp = setup_fixtures();
        let (db, _) = crawl_tree(&tmp);
        let galaxy = find_variant(&db, "Galaxy Black").id;
        assert_eq!(size_ids_of(&db, galaxy).len(), 2);
        assert_eq!(db.sizes.len(), 3);
        assert_eq!(db.purchase_links.len(), 3);
    }

    #[test]
    fn scalar_sizes_file_is_a_warning() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!(42));
        let (db, result) = crawl_tree(&tmp);
        assert!(db.sizes.is_empty());
        assert_eq!(db.variants.len(), 1);
        assert_eq!(
            find_issue(&result, "JSON Parse").message,
            "Sizes file must hold an object or a list of objects"
        );
    }

    #[test]
    fn single_object_sizes_file() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!({"filament_weight": 250}));
        let (db, _) = crawl_tree(&tmp);
        assert_eq!(db.sizes.len(), 1);
    }

    #[test]
    fn missing_sizes_file_keeps_variant() {
        let tmp = minimal_tree();
        fs::remove_file(sizes_path(&tmp)).unwrap();
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.variants.len(), 1);
        assert!(db.sizes.is_empty());
        assert_eq!(find_issue(&result, "Missing File").message, "Missing sizes.json");
    }

    // =========================================================================
    // Purchase links
    // =========================================================================

    #[test]
    fn dangling_store_reference_is_dropped_with_one_warning() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([{
            "filament_weight": 1000,
            "purchase_links": [{"store_id": "nowhere", "url": "https://example.com"}]
        }]));
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.sizes.len(), 1);
        assert!(db.purchase_links.is_empty());
        assert_eq!(result.errors.len(), 1);
        let issue = &result.errors[0];
        assert_eq!(issue.level, IssueLevel::Warning);
        assert_eq!(issue.category, "Invalid Reference");
        assert_eq!(issue.message, "Unknown store_id 'nowhere' at [0].purchase_links[0]");
    }

    #[test]
    fn link_without_url_is_skipped() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([{
            "filament_weight": 1000,
            "purchase_links": [{"store_id": "prusa_store"}]
        }]));
        let (db, result) = crawl_tree(&tmp);
        assert!(db.purchase_links.is_empty());
        assert_eq!(
            find_issue(&result, "Missing Field").message,
            "Purchase link [0].purchase_links[0] missing store_id or url"
        );
    }

    #[test]
    fn link_overrides_shipping() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([{
            "filament_weight": 1000,
            "purchase_links": [{
                "store_id": "prusa_store",
                "url": "https://example.com/refill",
                "spool_refill": true,
                "ships_to": "US"
            }]
        }]));
        let (db, _) = crawl_tree(&tmp);
        let link = &db.purchase_links[0];
        assert!(link.spool_refill);
        assert_eq!(link.ships_to.as_deref(), Some(&["US".to_string()][..]));
        assert_eq!(link.ships_from, None);
    }

    // =========================================================================
    // Failure policy
    // =========================================================================

    #[test]
    fn missing_data_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = crawl(&tmp.path().join("data"), &tmp.path().join("stores")).unwrap_err();
        assert!(matches!(err, CrawlError::MissingRoot(_)));
    }

    #[test]
    fn missing_stores_root_is_a_warning() {
        let tmp = minimal_tree();
        fs::remove_dir_all(tmp.path().join("stores")).unwrap();
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.brands.len(), 1);
        assert_eq!(find_issue(&result, "Directory").message, "Stores directory does not exist");
        assert!(result.is_valid());
    }

    #[test]
    fn missing_brand_manifest_skips_subtree() {
        let tmp = minimal_tree();
        fs::remove_file(tmp.path().join("data/Prusament/brand.json")).unwrap();
        let (db, result) = crawl_tree(&tmp);
        assert!(db.brands.is_empty());
        assert!(db.materials.is_empty() && db.sizes.is_empty());
        assert_eq!(find_issue(&result, "Missing File").message, "Missing brand.json");
    }

    #[test]
    fn unparseable_manifest_is_a_warning() {
        let tmp = minimal_tree();
        let filament = tmp.path().join("data/Prusament/PLA/Prusament PLA/filament.json");
        fs::write(&filament, "{ not json").unwrap();
        let (db, result) = crawl_tree(&tmp);
        assert!(db.filaments.is_empty());
        assert_eq!(db.materials.len(), 1);
        let issue = find_issue(&result, "JSON Parse");
        assert!(issue.message.starts_with("Failed to parse: "));
        assert_eq!(issue.path.as_deref(), Some(filament.as_path()));
    }

    #[test]
    fn fractional_dry_temperature_keeps_filament() {
        let tmp = minimal_tree();
        let filament = tmp.path().join("data/Prusament/PLA/Prusament PLA/filament.json");
        write_json(&filament, &json!({
            "name": "Prusament PLA", "density": 1.24, "max_dry_temperature": 55.5
        }));
        let (db, result) = crawl_tree(&tmp);
        assert!(result.is_empty(), "{:?}", result.errors);
        assert_eq!(db.filaments.len(), 1);
        assert_eq!(db.filaments[0].max_dry_temperature, Some(56));
        assert_eq!(db.variants.len(), 1);
        assert_eq!(db.sizes.len(), 1);
    }

    #[test]
    fn numeric_codes_keep_size() {
        let tmp = minimal_tree();
        write_json(&sizes_path(&tmp), &json!([{
            "filament_weight": 1000,
            "gtin": 8594173675179u64,
            "article_number": 12345,
            "purchase_links": [{"store_id": "prusa_store", "url": "https://example.com"}]
        }]));
        let (db, _) = crawl_tree(&tmp);
        assert_eq!(db.sizes.len(), 1);
        assert_eq!(db.sizes[0].gtin.as_deref(), Some("8594173675179"));
        assert_eq!(db.sizes[0].article_number.as_deref(), Some("12345"));
        assert_eq!(db.purchase_links.len(), 1);
    }

    #[test]
    fn mistyped_field_reads_as_unset() {
        let tmp = minimal_tree();
        let filament = tmp.path().join("data/Prusament/PLA/Prusament PLA/filament.json");
        write_json(&filament, &json!({
            "name": "Prusament PLA", "density": "heavy", "discontinued": "no"
        }));
        let (db, _) = crawl_tree(&tmp);
        assert_eq!(db.filaments[0].density, DEFAULT_DENSITY);
        assert!(!db.filaments[0].discontinued);
        assert_eq!(db.variants.len(), 1);
    }

    #[test]
    fn store_without_id_is_skipped() {
        let tmp = minimal_tree();
        write_json(&tmp.path().join("stores/anon/store.json"), &json!({"name": "Anon"}));
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.stores.len(), 1);
        assert_eq!(find_issue(&result, "Missing Field").message, "Store missing 'id' field");
    }

    #[test]
    fn hidden_directories_are_ignored() {
        let tmp = minimal_tree();
        fs::create_dir_all(tmp.path().join("data/.cache/junk")).unwrap();
        let (db, result) = crawl_tree(&tmp);
        assert_eq!(db.brands.len(), 1);
        assert!(result.is_empty());
    }

    #[test]
    fn brands_in_directory_order() {
        let tmp = minimal_tree();
        write_json(&tmp.path().join("data/Amolen/brand.json"), &json!({"name": "Amolen"}));
        write_json(&tmp.path().join("data/Zyltech/brand.json"), &json!({"name": "Zyltech"}));
        let (db, _) = crawl_tree(&tmp);
        let names: Vec<&str> = db.brands.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Amolen", "Prusament", "Zyltech"]);
    }
}
