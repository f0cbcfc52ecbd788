//! Relational SQLite exports.
//!
//! `filaments.db` holds the whole entity graph with foreign keys, lookup
//! indexes and three convenience views. `stores.db` holds only the store
//! table. Each database gets an `.xz` companion.
//!
//! Rows are bound from [`Record::cells`] against the storage column names,
//! so the `logo` column keeps its internal name here.

use super::{ExportError, ExportMeta, with_suffix, write_file};
use crate::model::{Cell, Database, Record};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Connection, SqliteConnection};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use xz2::write::XzEncoder;

const XZ_LEVEL: u32 = 9;

const CATALOG_DDL: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE brand (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    website TEXT NOT NULL,
    logo TEXT NOT NULL,
    origin TEXT NOT NULL
);
CREATE INDEX ix_brand_name ON brand(name);

CREATE TABLE material (
    id TEXT PRIMARY KEY,
    brand_id TEXT NOT NULL REFERENCES brand(id) ON DELETE CASCADE,
    material TEXT NOT NULL,
    slug TEXT,
    default_max_dry_temperature INTEGER,
    default_slicer_settings TEXT
);
CREATE INDEX ix_material_brand ON material(brand_id);
CREATE INDEX ix_material_type ON material(material);

CREATE TABLE filament (
    id TEXT PRIMARY KEY,
    brand_id TEXT NOT NULL REFERENCES brand(id) ON DELETE CASCADE,
    material_id TEXT NOT NULL REFERENCES material(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    material TEXT NOT NULL,
    density REAL NOT NULL,
    diameter_tolerance REAL NOT NULL,
    max_dry_temperature INTEGER,
    data_sheet_url TEXT,
    safety_sheet_url TEXT,
    discontinued INTEGER NOT NULL DEFAULT 0,
    slicer_ids TEXT,
    slicer_settings TEXT
);
CREATE INDEX ix_filament_brand ON filament(brand_id);
CREATE INDEX ix_filament_material ON filament(material_id);
CREATE INDEX ix_filament_slug ON filament(slug);

CREATE TABLE variant (
    id TEXT PRIMARY KEY,
    filament_id TEXT NOT NULL REFERENCES filament(id) ON DELETE CASCADE,
    slug TEXT NOT NULL,
    color_name TEXT NOT NULL,
    color_hex TEXT NOT NULL,
    hex_variants TEXT,
    color_standards TEXT,
    traits TEXT,
    discontinued INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX ix_variant_filament ON variant(filament_id);
CREATE INDEX ix_variant_slug ON variant(slug);
CREATE INDEX ix_variant_color ON variant(color_name);

CREATE TABLE size (
    id TEXT PRIMARY KEY,
    variant_id TEXT NOT NULL REFERENCES variant(id) ON DELETE CASCADE,
    filament_weight INTEGER NOT NULL,
    diameter REAL NOT NULL,
    empty_spool_weight INTEGER,
    spool_core_diameter REAL,
    gtin TEXT,
    article_number TEXT,
    barcode_identifier TEXT,
    nfc_identifier TEXT,
    qr_identifier TEXT,
    discontinued INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX ix_size_variant ON size(variant_id);
CREATE INDEX ix_size_gtin ON size(gtin);
CREATE INDEX ix_size_weight ON size(filament_weight);

CREATE TABLE store (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    storefront_url TEXT NOT NULL,
    logo TEXT NOT NULL,
    ships_from TEXT NOT NULL,
    ships_to TEXT NOT NULL
);
CREATE INDEX ix_store_name ON store(name);

CREATE TABLE purchase_link (
    id TEXT PRIMARY KEY,
    size_id TEXT NOT NULL REFERENCES size(id) ON DELETE CASCADE,
    store_id TEXT NOT NULL REFERENCES store(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    spool_refill INTEGER NOT NULL DEFAULT 0,
    ships_from TEXT,
    ships_to TEXT
);
CREATE INDEX ix_purchase_link_size ON purchase_link(size_id);
CREATE INDEX ix_purchase_link_store ON purchase_link(store_id);

CREATE VIEW v_full_variant AS
SELECT
    v.id AS variant_id,
    v.color_name,
    v.color_hex,
    v.slug AS variant_slug,
    f.id AS filament_id,
    f.name AS filament_name,
    f.slug AS filament_slug,
    f.material,
    f.density,
    f.diameter_tolerance,
    b.id AS brand_id,
    b.name AS brand_name,
    b.slug AS brand_slug
FROM variant v
JOIN filament f ON v.filament_id = f.id
JOIN brand b ON f.brand_id = b.id;

CREATE VIEW v_full_size AS
SELECT
    s.id AS size_id,
    s.filament_weight,
    s.diameter,
    s.gtin,
    v.id AS variant_id,
    v.color_name,
    v.color_hex,
    f.id AS filament_id,
    f.name AS filament_name,
    f.material,
    b.id AS brand_id,
    b.name AS brand_name
FROM size s
JOIN variant v ON s.variant_id = v.id
JOIN filament f ON v.filament_id = f.id
JOIN brand b ON f.brand_id = b.id;

CREATE VIEW v_purchase_offers AS
SELECT
    pl.id AS purchase_link_id,
    pl.url,
    pl.spool_refill,
    st.id AS store_id,
    st.name AS store_name,
    st.storefront_url,
    COALESCE(pl.ships_from, st.ships_from) AS ships_from,
    COALESCE(pl.ships_to, st.ships_to) AS ships_to,
    s.id AS size_id,
    s.filament_weight,
    s.diameter,
    s.gtin,
    v.color_name,
    v.color_hex,
    f.name AS filament_name,
    f.material,
    b.name AS brand_name
FROM purchase_link pl
JOIN store st ON pl.store_id = st.id
JOIN size s ON pl.size_id = s.id
JOIN variant v ON s.variant_id = v.id
JOIN filament f ON v.filament_id = f.id
JOIN brand b ON f.brand_id = b.id;
"#;

const STORES_DDL: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE store (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    storefront_url TEXT NOT NULL,
    logo TEXT NOT NULL,
    ships_from TEXT NOT NULL,
    ships_to TEXT NOT NULL
);
CREATE INDEX ix_store_name ON store(name);
CREATE INDEX ix_store_slug ON store(slug);

CREATE VIEW v_store_shipping AS
SELECT id, name, slug, storefront_url, ships_from, ships_to
FROM store;
"#;

/// Write both databases and their `.xz` companions, returning the paths.
pub fn export_sqlite(
    db: &Database,
    out_dir: &Path,
    meta: &ExportMeta,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = out_dir.join("sqlite");
    fs::create_dir_all(&dir)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let catalog = dir.join("filaments.db");
    runtime.block_on(write_catalog(db, &catalog, meta))?;
    let stores = dir.join("stores.db");
    runtime.block_on(write_stores(db, &stores, meta))?;

    Ok(vec![
        compress_xz(&catalog)?,
        catalog,
        compress_xz(&stores)?,
        stores,
    ])
}

async fn create(path: &Path) -> Result<SqliteConnection, ExportError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Delete);
    Ok(SqliteConnection::connect_with(&options).await?)
}

async fn write_catalog(db: &Database, path: &Path, meta: &ExportMeta) -> Result<(), ExportError> {
    let mut conn = create(path).await?;
    let mut tx = conn.begin().await?;

    sqlx::raw_sql(CATALOG_DDL).execute(&mut *tx).await?;
    insert_meta(&mut tx, "version", &meta.version).await?;
    insert_meta(&mut tx, "generated_at", &meta.generated_at).await?;

    // Parents before children so foreign keys hold row by row.
    insert_all(&mut tx, &db.brands).await?;
    insert_all(&mut tx, &db.materials).await?;
    insert_all(&mut tx, &db.filaments).await?;
    insert_all(&mut tx, &db.variants).await?;
    insert_all(&mut tx, &db.sizes).await?;
    insert_all(&mut tx, &db.stores).await?;
    insert_all(&mut tx, &db.purchase_links).await?;

    tx.commit().await?;
    conn.close().await?;
    debug!(path = %path.display(), "written");
    Ok(())
}

async fn write_stores(db: &Database, path: &Path, meta: &ExportMeta) -> Result<(), ExportError> {
    let mut conn = create(path).await?;
    let mut tx = conn.begin().await?;

    sqlx::raw_sql(STORES_DDL).execute(&mut *tx).await?;
    insert_meta(&mut tx, "version", &meta.version).await?;
    insert_meta(&mut tx, "generated_at", &meta.generated_at).await?;
    insert_meta(&mut tx, "store_count", &db.stores.len().to_string()).await?;
    insert_all(&mut tx, &db.stores).await?;

    tx.commit().await?;
    conn.close().await?;
    debug!(path = %path.display(), stores = db.stores.len(), "written");
    Ok(())
}

async fn insert_meta(
    conn: &mut SqliteConnection,
    key: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO meta (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(conn)
        .await?;
    Ok(())
}

fn insert_sql<R: Record>() -> String {
    let columns: Vec<&str> = R::KIND.columns().iter().map(|c| c.name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        R::KIND.name(),
        columns.join(", ")
    )
}

async fn insert_all<R: Record>(
    conn: &mut SqliteConnection,
    records: &[R],
) -> Result<(), sqlx::Error> {
    let sql = insert_sql::<R>();
    for record in records {
        let mut query = sqlx::query(&sql);
        for cell in record.cells() {
            query = match cell {
                Cell::Null => query.bind(None::<String>),
                Cell::Text(s) => query.bind(s),
                Cell::Int(i) => query.bind(i),
                Cell::Real(f) => query.bind(f),
                Cell::Bool(b) => query.bind(b),
                Cell::Json(v) => query.bind(v.to_string()),
            };
        }
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

fn compress_xz(path: &Path) -> std::io::Result<PathBuf> {
    let bytes = fs::read(path)?;
    let mut encoder = XzEncoder::new(Vec::new(), XZ_LEVEL);
    encoder.write_all(&bytes)?;
    let out = with_suffix(path, ".xz");
    write_file(&out, &encoder.finish()?)?;
    Ok(out)
}
