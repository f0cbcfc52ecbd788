//! One CSV file per entity kind, headers from the column tables.

use super::ExportError;
use crate::model::{Cell, Database, Record};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write `csv/<kind>.csv` for all seven kinds, returning the paths written.
pub fn export_csv(db: &Database, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let dir = out_dir.join("csv");
    fs::create_dir_all(&dir)?;
    Ok(vec![
        write_table(&dir, &db.brands)?,
        write_table(&dir, &db.materials)?,
        write_table(&dir, &db.filaments)?,
        write_table(&dir, &db.variants)?,
        write_table(&dir, &db.sizes)?,
        write_table(&dir, &db.stores)?,
        write_table(&dir, &db.purchase_links)?,
    ])
}

fn write_table<R: Record>(dir: &Path, records: &[R]) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{}.csv", R::KIND.plural()));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(R::KIND.columns().iter().map(|c| c.public_name))?;
    for record in records {
        writer.write_record(record.cells().iter().map(Cell::to_csv_field))?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = records.len(), "written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::crawl;
    use crate::test_helpers::{find_variant, setup_fixtures};
    use std::collections::HashMap;

    fn rows(path: &Path) -> Vec<HashMap<String, String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(Result::unwrap).collect()
    }

    fn exported() -> (tempfile::TempDir, Database) {
        let tmp = setup_fixtures();
        let (db, _) = crawl(&tmp.path().join("data"), &tmp.path().join("stores")).unwrap();
        export_csv(&db, &tmp.path().join("dist")).unwrap();
        (tmp, db)
    }

    #[test]
    fn writes_one_file_per_kind() {
        let (tmp, _) = exported();
        let mut names: Vec<String> = fs::read_dir(tmp.path().join("dist/csv"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "brands.csv",
                "filaments.csv",
                "materials.csv",
                "purchase_links.csv",
                "sizes.csv",
                "stores.csv",
                "variants.csv"
            ]
        );
    }

    #[test]
    fn brand_header_uses_public_logo_name() {
        let (tmp, _) = exported();
        let mut reader = csv::Reader::from_path(tmp.path().join("dist/csv/brands.csv")).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, ["id", "name", "slug", "website", "logo_name", "origin"]);
    }

    #[test]
    fn cells_render_booleans_nulls_and_lists() {
        let (tmp, db) = exported();
        let filaments = rows(&tmp.path().join("dist/csv/filaments.csv"));
        let discontinued: Vec<&str> = filaments
            .iter()
            .map(|r| r["discontinued"].as_str())
            .collect();
        assert!(discontinued.contains(&"1"));
        assert!(discontinued.contains(&"0"));

        let stores = rows(&tmp.path().join("dist/csv/stores.csv"));
        let prusa = stores.iter().find(|r| r["name"] == "Prusa Store").unwrap();
        assert_eq!(prusa["ships_from"], r#"["CZ"]"#);

        let galaxy = find_variant(&db, "Galaxy Black");
        let variants = rows(&tmp.path().join("dist/csv/variants.csv"));
        let row = variants.iter().find(|r| r["id"] == galaxy.id.to_string()).unwrap();
        assert_eq!(row["hex_variants"], "");
    }
}
