//! Static file API following the source hierarchy.
//!
//! ```text
//! api/v1/
//! ├── index.json                         # stats + endpoints
//! ├── brands/
//! │   ├── index.json
//! │   ├── logo/{index.json, <logo_id>.json, <logo_id>.<ext>}
//! │   └── <brand>/
//! │       ├── index.json                 # brand + materials list
//! │       └── materials/<material>/
//! │           ├── index.json             # material + filaments list
//! │           └── filaments/<filament>/
//! │               ├── index.json         # filament + variants list
//! │               └── variants/<variant>.json   # variant + sizes + links
//! ├── stores/
//! │   ├── index.json
//! │   ├── logo/...
//! │   └── <store>.json
//! └── schemas/{index.json, *.json}
//! ```
//!
//! Every directory level is addressed by slug. Brands and stores whose logo
//! was exported carry a `logo_slug` naming the copied file.

use super::{ExportError, ExportMeta, SourceDirs, object, write_pretty};
use crate::model::{Database, Filament, Material, PurchaseLink, Size, Variant};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Published logo file name stem and extension for an owner's logo.
///
/// The stem is `<name>_<logo with dots as underscores>_<8 hex digits>`, the
/// digits taken from a DNS-namespace UUIDv5 of `"<name>:<logo>"`.
pub fn logo_id(name: &str, logo: &str) -> (String, String) {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_DNS, format!("{name}:{logo}").as_bytes());
    let hex = digest.simple().to_string();
    let ext = Path::new(logo)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    (format!("{name}_{}_{}", logo.replace('.', "_"), &hex[..8]), ext)
}

/// Children of each parent id, in database order.
fn group_by<'a, T>(items: &'a [T], parent: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<&'a T>> {
    let mut groups: HashMap<Uuid, Vec<&T>> = HashMap::new();
    for item in items {
        groups.entry(parent(item)).or_default().push(item);
    }
    groups
}

fn children<'m, 'a, T>(groups: &'m HashMap<Uuid, Vec<&'a T>>, id: Uuid) -> &'m [&'a T] {
    groups.get(&id).map(Vec::as_slice).unwrap_or_default()
}

struct Lookup<'a> {
    materials: HashMap<Uuid, Vec<&'a Material>>,
    filaments: HashMap<Uuid, Vec<&'a Filament>>,
    variants: HashMap<Uuid, Vec<&'a Variant>>,
    sizes: HashMap<Uuid, Vec<&'a Size>>,
    purchase_links: HashMap<Uuid, Vec<&'a PurchaseLink>>,
}

impl<'a> Lookup<'a> {
    fn new(db: &'a Database) -> Self {
        Self {
            materials: group_by(&db.materials, |m| m.brand_id),
            filaments: group_by(&db.filaments, |f| f.material_id),
            variants: group_by(&db.variants, |v| v.filament_id),
            sizes: group_by(&db.sizes, |s| s.variant_id),
            purchase_links: group_by(&db.purchase_links, |p| p.size_id),
        }
    }
}

/// Write the API tree under `out_dir/api/v1`.
pub fn export_api(
    db: &Database,
    out_dir: &Path,
    meta: &ExportMeta,
    sources: &SourceDirs,
) -> Result<(), ExportError> {
    let api = out_dir.join("api").join("v1");
    fs::create_dir_all(&api)?;

    let schema_count = export_schemas(&api.join("schemas"), &sources.schemas_dir, meta)?;

    let brand_logos = export_logos(
        &api.join("brands").join("logo"),
        "brand",
        db.brands.iter().map(|b| LogoOwner {
            id: b.id,
            name: &b.name,
            logo: &b.logo,
            dir: sources.data_dir.join(&b.directory_name),
        }),
    )?;
    let store_logos = export_logos(
        &api.join("stores").join("logo"),
        "store",
        db.stores.iter().map(|s| LogoOwner {
            id: s.id,
            name: &s.name,
            logo: &s.logo,
            dir: sources.stores_dir.join(&s.directory_name),
        }),
    )?;

    write_root_index(db, &api, meta, schema_count > 0)?;
    let lookup = Lookup::new(db);
    let written = export_brands(db, &lookup, &api.join("brands"), meta, &brand_logos)?;
    export_stores(db, &api.join("stores"), meta, &store_logos)?;

    info!(
        schemas = schema_count,
        brand_logos = brand_logos.len(),
        store_logos = store_logos.len(),
        variants = written,
        stores = db.stores.len(),
        "static API written"
    );
    Ok(())
}

fn write_root_index(
    db: &Database,
    api: &Path,
    meta: &ExportMeta,
    has_schemas: bool,
) -> Result<(), ExportError> {
    let stats: Map<String, Value> = db
        .stats()
        .into_iter()
        .map(|(name, count)| (name.to_string(), Value::from(count)))
        .collect();

    let mut endpoints = Map::new();
    for (name, path) in [
        ("brands", "brands/index.json"),
        ("stores", "stores/index.json"),
        ("brand_logos", "brands/logo/index.json"),
        ("store_logos", "stores/logo/index.json"),
        ("all", "../json/all.json"),
    ] {
        endpoints.insert(name.to_string(), Value::from(path));
    }
    if has_schemas {
        endpoints.insert("schemas".to_string(), Value::from("schemas/index.json"));
    }

    write_pretty(
        &api.join("index.json"),
        &json!({
            "version": meta.version,
            "generated_at": meta.generated_at,
            "stats": stats,
            "endpoints": endpoints,
        }),
    )
}

// ============================================================================
// Entity tree
// ============================================================================

fn with_logo_slug(mut doc: Map<String, Value>, logos: &HashMap<Uuid, String>, id: Uuid) -> Value {
    if let Some(slug) = logos.get(&id) {
        doc.insert("logo_slug".to_string(), Value::from(slug.as_str()));
    }
    Value::Object(doc)
}

/// Returns the number of variant documents written.
fn export_brands(
    db: &Database,
    lookup: &Lookup<'_>,
    dir: &Path,
    meta: &ExportMeta,
    logos: &HashMap<Uuid, String>,
) -> Result<usize, ExportError> {
    let mut index = Vec::new();
    for brand in &db.brands {
        let entry = json!({
            "id": brand.id,
            "name": brand.name,
            "slug": brand.slug,
            "origin": brand.origin,
            "material_count": children(&lookup.materials, brand.id).len(),
            "path": format!("{}/index.json", brand.slug),
        });
        let Value::Object(entry) = entry else { continue };
        index.push(with_logo_slug(entry, logos, brand.id));
    }
    write_pretty(
        &dir.join("index.json"),
        &json!({
            "version": meta.version,
            "generated_at": meta.generated_at,
            "count": db.brands.len(),
            "brands": index,
        }),
    )?;

    let mut variant_count = 0;
    for brand in &db.brands {
        let brand_dir = dir.join(&brand.slug);
        let materials = children(&lookup.materials, brand.id);

        let listing: Vec<Value> = materials
            .iter()
            .map(|m| {
                json!({
                    "id": m.id,
                    "material": m.material,
                    "slug": m.slug,
                    "filament_count": children(&lookup.filaments, m.id).len(),
                    "path": format!("materials/{}/index.json", m.slug),
                })
            })
            .collect();
        let mut doc = object(brand)?;
        doc.insert("materials".to_string(), Value::from(listing));
        write_pretty(&brand_dir.join("index.json"), &with_logo_slug(doc, logos, brand.id))?;

        for material in materials {
            let material_dir = brand_dir.join("materials").join(&material.slug);
            variant_count += export_material(lookup, material, &material_dir)?;
        }
    }
    Ok(variant_count)
}

fn export_material(
    lookup: &Lookup<'_>,
    material: &Material,
    dir: &Path,
) -> Result<usize, ExportError> {
    let filaments = children(&lookup.filaments, material.id);
    let listing: Vec<Value> = filaments
        .iter()
        .map(|f| {
            json!({
                "id": f.id,
                "name": f.name,
                "slug": f.slug,
                "variant_count": children(&lookup.variants, f.id).len(),
                "path": format!("filaments/{}/index.json", f.slug),
            })
        })
        .collect();
    let mut doc = object(material)?;
    doc.insert("filaments".to_string(), Value::from(listing));
    write_pretty(&dir.join("index.json"), &doc)?;

    let mut variant_count = 0;
    for filament in filaments {
        let filament_dir = dir.join("filaments").join(&filament.slug);
        variant_count += export_filament(lookup, filament, &filament_dir)?;
    }
    Ok(variant_count)
}

fn export_filament(
    lookup: &Lookup<'_>,
    filament: &Filament,
    dir: &Path,
) -> Result<usize, ExportError> {
    let variants = children(&lookup.variants, filament.id);
    let listing: Vec<Value> = variants
        .iter()
        .map(|v| {
            json!({
                "id": v.id,
                "color_name": v.color_name,
                "color_hex": v.color_hex,
                "slug": v.slug,
                "size_count": children(&lookup.sizes, v.id).len(),
                "path": format!("variants/{}.json", v.slug),
            })
        })
        .collect();
    let mut doc = object(filament)?;
    doc.insert("variants".to_string(), Value::from(listing));
    write_pretty(&dir.join("index.json"), &doc)?;

    for variant in variants {
        let mut sizes = Vec::new();
        for size in children(&lookup.sizes, variant.id) {
            let mut size_doc = object(size)?;
            let links = children(&lookup.purchase_links, size.id);
            if !links.is_empty() {
                let links = links.iter().map(object).collect::<Result<Vec<_>, _>>()?;
                size_doc.insert("purchase_links".to_string(), Value::from(links));
            }
            sizes.push(Value::Object(size_doc));
        }
        let mut doc = object(variant)?;
        doc.insert("sizes".to_string(), Value::from(sizes));
        write_pretty(&dir.join("variants").join(format!("{}.json", variant.slug)), &doc)?;
    }
    Ok(variants.len())
}

fn export_stores(
    db: &Database,
    dir: &Path,
    meta: &ExportMeta,
    logos: &HashMap<Uuid, String>,
) -> Result<(), ExportError> {
    let mut index = Vec::new();
    for store in &db.stores {
        let entry = json!({
            "id": store.id,
            "name": store.name,
            "slug": store.slug,
            "storefront_url": store.storefront_url,
            "path": format!("{}.json", store.slug),
        });
        let Value::Object(entry) = entry else { continue };
        index.push(with_logo_slug(entry, logos, store.id));
    }
    write_pretty(
        &dir.join("index.json"),
        &json!({
            "version": meta.version,
            "generated_at": meta.generated_at,
            "count": db.stores.len(),
            "stores": index,
        }),
    )?;

    for store in &db.stores {
        let doc = with_logo_slug(object(store)?, logos, store.id);
        write_pretty(&dir.join(format!("{}.json", store.slug)), &doc)?;
    }
    Ok(())
}

// ============================================================================
// Logos
// ============================================================================

struct LogoOwner<'a> {
    id: Uuid,
    name: &'a str,
    logo: &'a str,
    /// Source directory holding the logo file.
    dir: PathBuf,
}

/// Copy each declared logo into `dir` with its metadata and an index.
///
/// Returns owner id -> published file name (`<logo_id>.<ext>`). Owners
/// without a logo are skipped; a declared logo that does not exist aborts.
fn export_logos<'a>(
    dir: &Path,
    kind: &'static str,
    owners: impl Iterator<Item = LogoOwner<'a>>,
) -> Result<HashMap<Uuid, String>, ExportError> {
    fs::create_dir_all(dir)?;
    let id_key = format!("{kind}_id");
    let name_key = format!("{kind}_name");

    let mut published = HashMap::new();
    let mut index = Vec::new();
    for owner in owners {
        if owner.logo.is_empty() {
            continue;
        }
        let source = owner.dir.join(owner.logo);
        if !source.is_file() {
            return Err(ExportError::MissingLogo {
                owner: kind,
                name: owner.name.to_string(),
                path: source,
            });
        }

        let (id, ext) = logo_id(owner.name, owner.logo);
        let file_name = format!("{id}.{ext}");
        fs::copy(&source, dir.join(&file_name))?;
        debug!(source = %source.display(), file = %file_name, "logo copied");

        let mut metadata = Map::new();
        metadata.insert("id".to_string(), Value::from(id.as_str()));
        metadata.insert("slug".to_string(), Value::from(id.as_str()));
        metadata.insert(id_key.clone(), Value::from(owner.id.to_string()));
        metadata.insert(name_key.clone(), Value::from(owner.name));
        metadata.insert("filename".to_string(), Value::from(owner.logo));
        metadata.insert("extension".to_string(), Value::from(ext.as_str()));
        metadata.insert("logo_file".to_string(), Value::from(file_name.as_str()));
        write_pretty(&dir.join(format!("{id}.json")), &metadata)?;

        let mut entry = Map::new();
        entry.insert("id".to_string(), Value::from(id.as_str()));
        entry.insert("slug".to_string(), Value::from(id.as_str()));
        entry.insert(id_key.clone(), Value::from(owner.id.to_string()));
        entry.insert(name_key.clone(), Value::from(owner.name));
        entry.insert("path".to_string(), Value::from(format!("{id}.json")));
        index.push(Value::Object(entry));

        published.insert(owner.id, file_name);
    }

    write_pretty(
        &dir.join("index.json"),
        &json!({"count": index.len(), "logos": index}),
    )?;
    Ok(published)
}

// ============================================================================
// Schemas
// ============================================================================

/// Copy every `*.json` schema in `schemas_dir` and write an index.
///
/// Returns the number of schemas published; a missing directory publishes
/// none.
fn export_schemas(dir: &Path, schemas_dir: &Path, meta: &ExportMeta) -> Result<usize, ExportError> {
    if !schemas_dir.is_dir() {
        return Ok(0);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(schemas_dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    fs::create_dir_all(dir)?;
    let mut entries = Vec::new();
    for path in &files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::copy(path, dir.join(&file))?;
        debug!(schema = %file, "schema copied");
        entries.push(json!({
            "name": stem.replace("_schema", "").replace("-schema", ""),
            "file": file,
            "path": file,
        }));
    }

    write_pretty(
        &dir.join("index.json"),
        &json!({
            "version": meta.version,
            "generated_at": meta.generated_at,
            "count": entries.len(),
            "schemas": entries,
        }),
    )?;
    Ok(entries.len())
}
