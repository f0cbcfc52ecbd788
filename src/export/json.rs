//! JSON, gzip and NDJSON exports plus per-brand files.
//!
//! ```text
//! json/
//! ├── all.json            # pretty, whole database
//! ├── all.json.gz         # compact, gzip
//! ├── all.ndjson          # meta line + one line per entity
//! └── brands/
//!     ├── index.json
//!     └── <slug>.json     # one brand's subgraph
//! ```

use super::{ExportError, ExportMeta, object, write_file, write_pretty};
use crate::model::{
    Brand, Database, Filament, Material, PurchaseLink, Record, Size, Variant,
};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct AllDocument<'a> {
    version: &'a str,
    generated_at: &'a str,
    #[serde(flatten)]
    db: &'a Database,
}

#[derive(Serialize)]
struct BrandDocument<'a> {
    version: &'a str,
    generated_at: &'a str,
    brand: &'a Brand,
    materials: Vec<&'a Material>,
    filaments: Vec<&'a Filament>,
    variants: Vec<&'a Variant>,
    sizes: Vec<&'a Size>,
    purchase_links: Vec<&'a PurchaseLink>,
}

/// Write every JSON artifact, returning the paths written.
pub fn export_json(
    db: &Database,
    out_dir: &Path,
    meta: &ExportMeta,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = out_dir.join("json");
    let mut written = export_all_json(db, &dir, meta)?;
    written.push(export_ndjson(db, &dir, meta)?);
    written.extend(export_per_brand(db, &dir.join("brands"), meta)?);
    Ok(written)
}

fn export_all_json(
    db: &Database,
    dir: &Path,
    meta: &ExportMeta,
) -> Result<Vec<PathBuf>, ExportError> {
    let document = AllDocument {
        version: &meta.version,
        generated_at: &meta.generated_at,
        db,
    };

    let pretty = dir.join("all.json");
    write_pretty(&pretty, &document)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    serde_json::to_writer(&mut encoder, &document)?;
    let gz = dir.join("all.json.gz");
    write_file(&gz, &encoder.finish()?)?;

    Ok(vec![pretty, gz])
}

fn push_lines<R: Record>(out: &mut String, records: &[R]) -> Result<(), ExportError> {
    for record in records {
        let mut line = serde_json::Map::new();
        line.insert("_type".to_string(), Value::from(R::KIND.name()));
        line.extend(object(record)?);
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    Ok(())
}

fn export_ndjson(db: &Database, dir: &Path, meta: &ExportMeta) -> Result<PathBuf, ExportError> {
    let header = json!({
        "_type": "meta",
        "version": meta.version,
        "generated_at": meta.generated_at,
    });
    let mut out = header.to_string();
    out.push('\n');

    push_lines(&mut out, &db.brands)?;
    push_lines(&mut out, &db.materials)?;
    push_lines(&mut out, &db.filaments)?;
    push_lines(&mut out, &db.variants)?;
    push_lines(&mut out, &db.sizes)?;
    push_lines(&mut out, &db.stores)?;
    push_lines(&mut out, &db.purchase_links)?;

    let path = dir.join("all.ndjson");
    write_file(&path, out.as_bytes())?;
    Ok(path)
}

/// Everything reachable from one brand, in database order.
fn brand_subgraph<'a>(
    db: &'a Database,
    brand: &'a Brand,
    meta: &'a ExportMeta,
) -> BrandDocument<'a> {
    let materials: Vec<&Material> = db
        .materials
        .iter()
        .filter(|m| m.brand_id == brand.id)
        .collect();
    let filaments: Vec<&Filament> = db
        .filaments
        .iter()
        .filter(|f| f.brand_id == brand.id)
        .collect();

    let filament_ids: HashSet<_> = filaments.iter().map(|f| f.id).collect();
    let variants: Vec<&Variant> = db
        .variants
        .iter()
        .filter(|v| filament_ids.contains(&v.filament_id))
        .collect();

    let variant_ids: HashSet<_> = variants.iter().map(|v| v.id).collect();
    let sizes: Vec<&Size> = db
        .sizes
        .iter()
        .filter(|s| variant_ids.contains(&s.variant_id))
        .collect();

    let size_ids: HashSet<_> = sizes.iter().map(|s| s.id).collect();
    let purchase_links: Vec<&PurchaseLink> = db
        .purchase_links
        .iter()
        .filter(|p| size_ids.contains(&p.size_id))
        .collect();

    BrandDocument {
        version: &meta.version,
        generated_at: &meta.generated_at,
        brand,
        materials,
        filaments,
        variants,
        sizes,
        purchase_links,
    }
}

fn export_per_brand(
    db: &Database,
    dir: &Path,
    meta: &ExportMeta,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();
    let mut entries = Vec::new();

    for brand in &db.brands {
        let path = dir.join(format!("{}.json", brand.slug));
        write_pretty(&path, &brand_subgraph(db, brand, meta))?;
        written.push(path);
        entries.push(json!({
            "id": brand.id,
            "name": brand.name,
            "slug": brand.slug,
            "path": format!("brands/{}.json", brand.slug),
        }));
    }

    let index = dir.join("index.json");
    write_pretty(
        &index,
        &json!({
            "version": meta.version,
            "generated_at": meta.generated_at,
            "brands": entries,
        }),
    )?;
    written.push(index);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::crawl;
    use crate::test_helpers::setup_fixtures;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;

    fn meta() -> ExportMeta {
        ExportMeta {
            version: "2026.01.02".to_string(),
            generated_at: "2026-01-02T03:04:05Z".to_string(),
        }
    }

    fn exported() -> (tempfile::TempDir, Database) {
        let tmp = setup_fixtures();
        let (db, _) = crawl(&tmp.path().join("data"), &tmp.path().join("stores")).unwrap();
        export_json(&db, &tmp.path().join("dist"), &meta()).unwrap();
        (tmp, db)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn all_json_has_meta_then_collections() {
        let (tmp, db) = exported();
        let doc = read_json(&tmp.path().join("dist/json/all.json"));
        let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "version",
                "generated_at",
                "brands",
                "materials",
                "filaments",
                "variants",
                "sizes",
                "stores",
                "purchase_links"
            ]
        );
        assert_eq!(doc["sizes"].as_array().unwrap().len(), db.sizes.len());
        assert!(doc["brands"][0].get("directory_name").is_none());
        assert_eq!(doc["brands"][0]["logo_name"], "logo.png");
    }

    #[test]
    fn gzip_matches_pretty_document() {
        let (tmp, _) = exported();
        let mut text = String::new();
        GzDecoder::new(fs::File::open(tmp.path().join("dist/json/all.json.gz")).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        let compact: Value = serde_json::from_str(&text).unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(compact, read_json(&tmp.path().join("dist/json/all.json")));
    }

    #[test]
    fn ndjson_lines_are_typed() {
        let (tmp, db) = exported();
        let text = fs::read_to_string(tmp.path().join("dist/json/all.ndjson")).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        let total: usize = db.stats().iter().map(|(_, n)| n).sum();
        assert_eq!(lines.len(), total + 1);
        assert_eq!(
            lines[0],
            json!({
                "_type": "meta",
                "version": "2026.01.02",
                "generated_at": "2026-01-02T03:04:05Z"
            })
        );
        assert_eq!(lines[1]["_type"], "brand");
        assert_eq!(lines.last().unwrap()["_type"], "purchase_link");
        let brand_line = text.lines().nth(1).unwrap();
        assert!(brand_line.starts_with(r#"{"_type":"brand","id":"#));
    }

    #[test]
    fn per_brand_file_holds_only_its_subgraph() {
        let (tmp, db) = exported();
        let doc = read_json(&tmp.path().join("dist/json/brands/prusament.json"));
        assert_eq!(doc["brand"]["name"], "Prusament");
        assert_eq!(doc["variants"].as_array().unwrap().len(), db.variants.len());
        assert_eq!(
            doc["purchase_links"].as_array().unwrap().len(),
            db.purchase_links.len()
        );
        assert!(doc.get("stores").is_none());

        let index = read_json(&tmp.path().join("dist/json/brands/index.json"));
        assert_eq!(index["brands"][0]["path"], "brands/prusament.json");
        assert_eq!(index["brands"][0]["slug"], "prusament");
    }
}
