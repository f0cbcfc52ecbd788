//! Normalized entity graph.
//!
//! The crawler builds one [`Database`] per run; exporters only read it.
//!
//! ```text
//! Brand ─┬─ Material ─── Filament ─── Variant ─── Size ─── PurchaseLink ─── Store
//!        └──────────────── (brand_id) ──┘
//! ```
//!
//! ## Public Serialization
//!
//! `serde::Serialize` on these types is the public JSON form: `None` fields
//! are omitted, `directory_name` is never emitted, and `logo` is published
//! as `logo_name` for brands and stores.
//!
//! ## Column Tables
//!
//! Tabular exporters (CSV, SQLite) do not reflect over structs. Each entity
//! kind declares its ordered columns in [`EntityKind::columns`] and each
//! record yields matching [`Cell`]s through [`Record::cells`]. A column has a
//! storage name (SQLite keeps `logo`) and a public name (CSV uses
//! `logo_name`).

use crate::ids::format_float;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Nested value objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlicerSettings {
    pub profile_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericSlicerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_layer_bed_temp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_layer_nozzle_temp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_temp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nozzle_temp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllSlicerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prusaslicer: Option<SlicerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bambustudio: Option<SlicerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcaslicer: Option<SlicerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cura: Option<SlicerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic: Option<GenericSlicerSettings>,
}

/// Profile identifiers of this filament inside each slicer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlicerIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prusaslicer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bambustudio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcaslicer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cura: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorStandards {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pantone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub munsell: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VariantTraits {
    pub translucent: bool,
    pub glow: bool,
    pub matte: bool,
    pub recycled: bool,
    pub recyclable: bool,
    pub biodegradable: bool,
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// Source directory under the data root. Internal only.
    #[serde(skip)]
    pub directory_name: String,
    pub website: String,
    #[serde(rename = "logo_name")]
    pub logo: String,
    /// ISO 3166-1 alpha-2 country code, or `"Unknown"`.
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub id: Uuid,
    pub brand_id: Uuid,
    /// Material type (PLA, PETG, ...).
    pub material: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_max_dry_temperature: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_slicer_settings: Option<AllSlicerSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filament {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub material_id: Uuid,
    pub name: String,
    pub slug: String,
    pub material: String,
    pub density: f64,
    pub diameter_tolerance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dry_temperature: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_sheet_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_sheet_url: Option<String>,
    pub discontinued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicer_ids: Option<SlicerIds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicer_settings: Option<AllSlicerSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub id: Uuid,
    pub filament_id: Uuid,
    pub slug: String,
    pub color_name: String,
    pub color_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex_variants: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_standards: Option<ColorStandards>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<VariantTraits>,
    pub discontinued: bool,
}

/// One spool size / SKU of a variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Size {
    pub id: Uuid,
    pub variant_id: Uuid,
    /// Grams of filament on the spool.
    pub filament_weight: i64,
    /// Millimetres; 1.75 when the source omits it or gives zero.
    pub diameter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_spool_weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spool_core_diameter: Option<f64>,
    /// GTIN-12/13, falling back to the declared EAN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfc_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_identifier: Option<String>,
    pub discontinued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip)]
    pub directory_name: String,
    pub storefront_url: String,
    #[serde(rename = "logo_name")]
    pub logo: String,
    pub ships_from: Vec<String>,
    pub ships_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseLink {
    pub id: Uuid,
    pub size_id: Uuid,
    pub store_id: Uuid,
    pub url: String,
    pub spool_refill: bool,
    /// Overrides the store's `ships_from` when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ships_from: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ships_to: Option<Vec<String>>,
}

// ============================================================================
// Database aggregate
// ============================================================================

/// All entities of one crawl, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Database {
    pub brands: Vec<Brand>,
    pub materials: Vec<Material>,
    pub filaments: Vec<Filament>,
    pub variants: Vec<Variant>,
    pub sizes: Vec<Size>,
    pub stores: Vec<Store>,
    pub purchase_links: Vec<PurchaseLink>,
}

impl Database {
    pub fn get_brand(&self, id: Uuid) -> Option<&Brand> {
        self.brands.iter().find(|b| b.id == id)
    }

    pub fn get_material(&self, id: Uuid) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn get_filament(&self, id: Uuid) -> Option<&Filament> {
        self.filaments.iter().find(|f| f.id == id)
    }

    pub fn get_variant(&self, id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn get_size(&self, id: Uuid) -> Option<&Size> {
        self.sizes.iter().find(|s| s.id == id)
    }

    pub fn get_store(&self, id: Uuid) -> Option<&Store> {
        self.stores.iter().find(|s| s.id == id)
    }

    pub fn get_purchase_link(&self, id: Uuid) -> Option<&PurchaseLink> {
        self.purchase_links.iter().find(|p| p.id == id)
    }

    /// Entity counts keyed by collection name, in collection order.
    pub fn stats(&self) -> [(&'static str, usize); 7] {
        [
            ("brands", self.brands.len()),
            ("materials", self.materials.len()),
            ("filaments", self.filaments.len()),
            ("variants", self.variants.len()),
            ("sizes", self.sizes.len()),
            ("stores", self.stores.len()),
            ("purchase_links", self.purchase_links.len()),
        ]
    }
}

// ============================================================================
// Column tables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Brand,
    Material,
    Filament,
    Variant,
    Size,
    Store,
    PurchaseLink,
}

/// A column of a tabular export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Storage name (SQLite column).
    pub name: &'static str,
    /// Public name (CSV header).
    pub public_name: &'static str,
}

const fn col(name: &'static str) -> Column {
    Column {
        name,
        public_name: name,
    }
}

const LOGO: Column = Column {
    name: "logo",
    public_name: "logo_name",
};

const BRAND_COLUMNS: &[Column] = &[
    col("id"),
    col("name"),
    col("slug"),
    col("website"),
    LOGO,
    col("origin"),
];

const MATERIAL_COLUMNS: &[Column] = &[
    col("id"),
    col("brand_id"),
    col("material"),
    col("slug"),
    col("default_max_dry_temperature"),
    col("default_slicer_settings"),
];

const FILAMENT_COLUMNS: &[Column] = &[
    col("id"),
    col("brand_id"),
    col("material_id"),
    col("name"),
    col("slug"),
    col("material"),
    col("density"),
    col("diameter_tolerance"),
    col("max_dry_temperature"),
    col("data_sheet_url"),
    col("safety_sheet_url"),
    col("discontinued"),
    col("slicer_ids"),
    col("slicer_settings"),
];

const VARIANT_COLUMNS: &[Column] = &[
    col("id"),
    col("filament_id"),
    col("slug"),
    col("color_name"),
    col("color_hex"),
    col("hex_variants"),
    col("color_standards"),
    col("traits"),
    col("discontinued"),
];

const SIZE_COLUMNS: &[Column] = &[
    col("id"),
    col("variant_id"),
    col("filament_weight"),
    col("diameter"),
    col("empty_spool_weight"),
    col("spool_core_diameter"),
    col("gtin"),
    col("article_number"),
    col("barcode_identifier"),
    col("nfc_identifier"),
    col("qr_identifier"),
    col("discontinued"),
];

const STORE_COLUMNS: &[Column] = &[
    col("id"),
    col("name"),
    col("slug"),
    col("storefront_url"),
    LOGO,
    col("ships_from"),
    col("ships_to"),
];

const PURCHASE_LINK_COLUMNS: &[Column] = &[
    col("id"),
    col("size_id"),
    col("store_id"),
    col("url"),
    col("spool_refill"),
    col("ships_from"),
    col("ships_to"),
];

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Brand,
        EntityKind::Material,
        EntityKind::Filament,
        EntityKind::Variant,
        EntityKind::Size,
        EntityKind::Store,
        EntityKind::PurchaseLink,
    ];

    pub fn columns(self) -> &'static [Column] {
        match self {
            EntityKind::Brand => BRAND_COLUMNS,
            EntityKind::Material => MATERIAL_COLUMNS,
            EntityKind::Filament => FILAMENT_COLUMNS,
            EntityKind::Variant => VARIANT_COLUMNS,
            EntityKind::Size => SIZE_COLUMNS,
            EntityKind::Store => STORE_COLUMNS,
            EntityKind::PurchaseLink => PURCHASE_LINK_COLUMNS,
        }
    }

    /// Singular name: SQLite table and NDJSON `_type`.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Brand => "brand",
            EntityKind::Material => "material",
            EntityKind::Filament => "filament",
            EntityKind::Variant => "variant",
            EntityKind::Size => "size",
            EntityKind::Store => "store",
            EntityKind::PurchaseLink => "purchase_link",
        }
    }

    /// Plural name: `Database` collection and CSV file stem.
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Brand => "brands",
            EntityKind::Material => "materials",
            EntityKind::Filament => "filaments",
            EntityKind::Variant => "variants",
            EntityKind::Size => "sizes",
            EntityKind::Store => "stores",
            EntityKind::PurchaseLink => "purchase_links",
        }
    }
}

/// A single value of a tabular row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    /// Nested object or list, stored as compact JSON text.
    Json(Value),
}

impl Cell {
    fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    fn id(id: Uuid) -> Self {
        Cell::Text(id.to_string())
    }

    fn opt_text(s: &Option<String>) -> Self {
        s.as_deref().map_or(Cell::Null, Cell::text)
    }

    fn opt_int(v: Option<i64>) -> Self {
        v.map_or(Cell::Null, Cell::Int)
    }

    fn opt_real(v: Option<f64>) -> Self {
        v.map_or(Cell::Null, Cell::Real)
    }

    fn json<T: Serialize>(value: &T) -> Self {
        serde_json::to_value(value).map_or(Cell::Null, Cell::Json)
    }

    fn opt_json<T: Serialize>(value: &Option<T>) -> Self {
        value.as_ref().map_or(Cell::Null, Cell::json)
    }

    /// CSV rendering: null is empty, booleans are `1`/`0`, nested values JSON.
    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Real(f) => format_float(*f),
            Cell::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Cell::Json(v) => v.to_string(),
        }
    }
}

/// An entity that can be written as a row of its kind's column table.
pub trait Record: Serialize {
    const KIND: EntityKind;

    /// Values in [`EntityKind::columns`] order.
    fn cells(&self) -> Vec<Cell>;
}

impl Record for Brand {
    const KIND: EntityKind = EntityKind::Brand;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::text(&self.name),
            Cell::text(&self.slug),
            Cell::text(&self.website),
            Cell::text(&self.logo),
            Cell::text(&self.origin),
        ]
    }
}

impl Record for Material {
    const KIND: EntityKind = EntityKind::Material;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::id(self.brand_id),
            Cell::text(&self.material),
            Cell::text(&self.slug),
            Cell::opt_int(self.default_max_dry_temperature),
            Cell::opt_json(&self.default_slicer_settings),
        ]
    }
}

impl Record for Filament {
    const KIND: EntityKind = EntityKind::Filament;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::id(self.brand_id),
            Cell::id(self.material_id),
            Cell::text(&self.name),
            Cell::text(&self.slug),
            Cell::text(&self.material),
            Cell::Real(self.density),
            Cell::Real(self.diameter_tolerance),
            Cell::opt_int(self.max_dry_temperature),
            Cell::opt_text(&self.data_sheet_url),
            Cell::opt_text(&self.safety_sheet_url),
            Cell::Bool(self.discontinued),
            Cell::opt_json(&self.slicer_ids),
            Cell::opt_json(&self.slicer_settings),
        ]
    }
}

impl Record for Variant {
    const KIND: EntityKind = EntityKind::Variant;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::id(self.filament_id),
            Cell::text(&self.slug),
            Cell::text(&self.color_name),
            Cell::text(&self.color_hex),
            Cell::opt_json(&self.hex_variants),
            Cell::opt_json(&self.color_standards),
            Cell::opt_json(&self.traits),
            Cell::Bool(self.discontinued),
        ]
    }
}

impl Record for Size {
    const KIND: EntityKind = EntityKind::Size;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::id(self.variant_id),
            Cell::Int(self.filament_weight),
            Cell::Real(self.diameter),
            Cell::opt_int(self.empty_spool_weight),
            Cell::opt_real(self.spool_core_diameter),
            Cell::opt_text(&self.gtin),
            Cell::opt_text(&self.article_number),
            Cell::opt_text(&self.barcode_identifier),
            Cell::opt_text(&self.nfc_identifier),
            Cell::opt_text(&self.qr_identifier),
            Cell::Bool(self.discontinued),
        ]
    }
}

impl Record for Store {
    const KIND: EntityKind = EntityKind::Store;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::text(&self.name),
            Cell::text(&self.slug),
            Cell::text(&self.storefront_url),
            Cell::text(&self.logo),
            Cell::json(&self.ships_from),
            Cell::json(&self.ships_to),
        ]
    }
}

impl Record for PurchaseLink {
    const KIND: EntityKind = EntityKind::PurchaseLink;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::id(self.id),
            Cell::id(self.size_id),
            Cell::id(self.store_id),
            Cell::text(&self.url),
            Cell::Bool(self.spool_refill),
            Cell::opt_json(&self.ships_from),
            Cell::opt_json(&self.ships_to),
        ]
    }
}
