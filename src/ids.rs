//! Deterministic entity identifiers.
//!
//! Every entity in the database gets a UUIDv5 computed from a fixed namespace
//! and its identifying inputs. Rebuilding from unchanged source data always
//! yields the same IDs, so downstream consumers can cache and diff by ID.
//!
//! ## Derivation
//!
//! ```text
//! id = uuid_v5(namespace, component_1 || component_2 || ...)
//! ```
//!
//! Components are concatenated as raw bytes in argument order:
//! - strings contribute their UTF-8 bytes
//! - parent IDs contribute their 16-byte binary form
//! - byte strings (NFC tag UIDs) are used as-is
//!
//! This is the standard RFC 4122 §4.3 construction: SHA-1 over
//! `namespace_bytes || name`, truncated to 16 bytes with the version and
//! variant bits set, which is exactly what [`Uuid::new_v5`] computes.
//!
//! ## Per-Entity Formulas
//!
//! | Entity | Namespace | Components |
//! |--------|-----------|------------|
//! | Brand | `NAMESPACE_BRAND` | name |
//! | Material | `NAMESPACE_MATERIAL` | brand_id, material name |
//! | Filament | `NAMESPACE_FILAMENT` | brand_id, material_id, filament name |
//! | Variant | `NAMESPACE_VARIANT` | filament_id, color name |
//! | Size | `NAMESPACE_SIZE` | variant_id, composite string (see [`size_key`]) |
//! | Store | `NAMESPACE_STORE` | declared store id |
//! | Purchase link | `NAMESPACE_PURCHASE_LINK` | size_id, store_id, url |
//!
//! The namespace constants are protocol constants shared with the published
//! dataset. Changing any of them changes every ID downstream.

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::{Uuid, uuid};

pub const NAMESPACE_BRAND: Uuid = uuid!("5269dfb7-1559-440a-85be-aba5f3eff2d2");
pub const NAMESPACE_MATERIAL: Uuid = uuid!("616fc86d-7d99-4953-96c7-46d2836b9be9");
pub const NAMESPACE_PACKAGE: Uuid = uuid!("6f7d485e-db8d-4979-904e-a231cd6602b2");
pub const NAMESPACE_INSTANCE: Uuid = uuid!("31062f81-b5bd-4f86-a5f8-46367e841508");

// Extended namespaces for entities outside the tag data format.
pub const NAMESPACE_FILAMENT: Uuid = uuid!("a1b2c3d4-e5f6-4a5b-8c9d-0e1f2a3b4c5d");
pub const NAMESPACE_VARIANT: Uuid = uuid!("b2c3d4e5-f6a7-5b6c-9d0e-1f2a3b4c5d6e");
pub const NAMESPACE_SIZE: Uuid = uuid!("c3d4e5f6-a7b8-6c7d-0e1f-2a3b4c5d6e7f");
pub const NAMESPACE_STORE: Uuid = uuid!("d4e5f6a7-b8c9-7d8e-1f2a-3b4c5d6e7f8a");
pub const NAMESPACE_PURCHASE_LINK: Uuid = uuid!("e5f6a7b8-c9d0-8e9f-2a3b-4c5d6e7f8a9b");

/// Diameter used in the size key when an entry does not declare one.
const DEFAULT_DIAMETER_KEY: &str = "1.75";

#[derive(Error, Debug)]
pub enum IdError {
    #[error("Invalid UUID '{input}': {source}")]
    Format {
        input: String,
        #[source]
        source: uuid::Error,
    },
}

/// One input to [`derive`].
#[derive(Debug, Clone, Copy)]
pub enum Component<'a> {
    Bytes(&'a [u8]),
    Str(&'a str),
    Id(Uuid),
}

impl Component<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Component::Bytes(b) => b,
            Component::Str(s) => s.as_bytes(),
            Component::Id(id) => id.as_bytes(),
        }
    }
}

impl<'a> From<&'a str> for Component<'a> {
    fn from(s: &'a str) -> Self {
        Component::Str(s)
    }
}

impl<'a> From<&'a [u8]> for Component<'a> {
    fn from(b: &'a [u8]) -> Self {
        Component::Bytes(b)
    }
}

impl From<Uuid> for Component<'_> {
    fn from(id: Uuid) -> Self {
        Component::Id(id)
    }
}

/// Derive a UUIDv5 from a namespace and the concatenation of `components`.
pub fn derive(namespace: &Uuid, components: &[Component<'_>]) -> Uuid {
    let mut name = Vec::with_capacity(components.iter().map(|c| c.bytes().len()).sum());
    for component in components {
        name.extend_from_slice(component.bytes());
    }
    Uuid::new_v5(namespace, &name)
}

/// Parse a hyphenated UUID string, e.g. a parent ID handed in by a caller.
///
/// A malformed string means upstream data is corrupt, so the error carries
/// the offending input and must be propagated.
pub fn parse(input: &str) -> Result<Uuid, IdError> {
    Uuid::parse_str(input).map_err(|source| IdError::Format {
        input: input.to_string(),
        source,
    })
}

pub fn brand_id(name: &str) -> Uuid {
    derive(&NAMESPACE_BRAND, &[name.into()])
}

pub fn material_id(brand_id: Uuid, material: &str) -> Uuid {
    derive(&NAMESPACE_MATERIAL, &[brand_id.into(), material.into()])
}

/// Package ID for a GTIN-labelled product of a brand.
pub fn package_id(brand_id: Uuid, gtin: &str) -> Uuid {
    derive(&NAMESPACE_PACKAGE, &[brand_id.into(), gtin.into()])
}

/// Instance ID for a physical spool, keyed by its NFC tag UID (MSB first).
pub fn instance_id(nfc_tag_uid: &[u8]) -> Uuid {
    derive(&NAMESPACE_INSTANCE, &[nfc_tag_uid.into()])
}

pub fn filament_id(brand_id: Uuid, material_id: Uuid, name: &str) -> Uuid {
    derive(
        &NAMESPACE_FILAMENT,
        &[brand_id.into(), material_id.into(), name.into()],
    )
}

pub fn variant_id(filament_id: Uuid, color_name: &str) -> Uuid {
    derive(&NAMESPACE_VARIANT, &[filament_id.into(), color_name.into()])
}

/// Size ID for entry `index` of a `sizes.json` document.
pub fn size_id(variant_id: Uuid, entry: &Map<String, Value>, index: usize) -> Uuid {
    let key = size_key(entry, index);
    derive(&NAMESPACE_SIZE, &[variant_id.into(), key.as_str().into()])
}

pub fn store_id(declared_id: &str) -> Uuid {
    derive(&NAMESPACE_STORE, &[declared_id.into()])
}

pub fn purchase_link_id(size_id: Uuid, store_id: Uuid, url: &str) -> Uuid {
    derive(
        &NAMESPACE_PURCHASE_LINK,
        &[size_id.into(), store_id.into(), url.into()],
    )
}

/// Build the composite string that identifies a size within its variant.
///
/// ```text
/// {weight}g_{diameter}mm[_gtin:<gtin>|_ean:<ean>][_refill][_art:<article>]_idx:<index>
/// ```
///
/// Values are rendered from the raw JSON exactly as the published dataset
/// renders them: integers stay integral (`1000g`), floats keep a fractional
/// part (`1000.0g`), and an absent diameter renders as `1.75`. Optional parts
/// only participate when truthy. The index always comes last so two identical
/// entries in one file still get distinct IDs.
///
/// Floats always render positionally. Magnitudes below `1e-4` or from `1e16`
/// up would be written in exponent form (`1e-07`, `1e+16`) by the dataset's
/// published keys, so such entries get different IDs here. No real spool
/// weight or diameter falls in that range.
pub fn size_key(entry: &Map<String, Value>, index: usize) -> String {
    let mut parts = vec![
        format!("{}g", render(entry.get("filament_weight"))),
        match entry.get("diameter") {
            Some(d) => format!("{}mm", render(Some(d))),
            None => format!("{DEFAULT_DIAMETER_KEY}mm"),
        },
    ];

    if let Some(gtin) = entry.get("gtin").filter(|v| truthy(v)) {
        parts.push(format!("gtin:{}", render(Some(gtin))));
    } else if let Some(ean) = entry.get("ean").filter(|v| truthy(v)) {
        parts.push(format!("ean:{}", render(Some(ean))));
    }

    if entry.get("spool_refill").is_some_and(truthy) {
        parts.push("refill".to_string());
    }

    if let Some(article) = entry.get("article_number").filter(|v| truthy(v)) {
        parts.push(format!("art:{}", render(Some(article))));
    }

    parts.push(format!("idx:{index}"));
    parts.join("_")
}

/// Render a JSON value the way the dataset's key strings expect.
fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => format_float(f),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Render a float with at least one fractional digit (`1000.0`, `1.75`).
///
/// Never uses exponent notation: `1e-7` renders as `0.0000001`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// JSON truthiness: null, false, zero, and empty strings/containers are false.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // =========================================================================
    // Published literals
    // =========================================================================

    #[test]
    fn brand_literal() {
        assert_eq!(
            brand_id("Prusament").to_string(),
            "ae5ff34e-298e-50c9-8f77-92a97fb30b09"
        );
    }

    #[test]
    fn material_literal() {
        let brand = brand_id("Prusament");
        assert_eq!(
            material_id(brand, "PLA Prusa Galaxy Black").to_string(),
            "1aaca54a-431f-5601-adf5-85dd018f487f"
        );
    }

    #[test]
    fn package_literal() {
        let brand = brand_id("Prusament");
        assert_eq!(
            package_id(brand, "1234").to_string(),
            "7ed3ce83-764d-56de-bdcd-dc5226a0efd1"
        );
    }

    #[test]
    fn instance_literal() {
        let uid = b"\xE0\x04\x01\x08\x66\x2F\x6F\xBC";
        assert_eq!(
            instance_id(uid).to_string(),
            "bf63e92d-9ca5-53d7-9fab-ffdd0240c585"
        );
    }

    #[test]
    fn derived_chain_literals() {
        let brand = brand_id("Prusament");
        let material = material_id(brand, "PLA");
        assert_eq!(material.to_string(), "8861325c-1c16-560c-83b3-195ef25afd43");

        let filament = filament_id(brand, material, "Prusament PLA");
        assert_eq!(filament.to_string(), "39dc7dbb-5500-58e5-9815-dc537fefd632");

        let variant = variant_id(filament, "Galaxy Black");
        assert_eq!(variant.to_string(), "ba8d0917-ff22-513b-970c-ad939e57122e");

        let size = size_id(
            variant,
            &entry(json!({"filament_weight": 1000, "diameter": 1.75, "gtin": "8594173675179"})),
            0,
        );
        assert_eq!(size.to_string(), "9c795b0d-f1cb-59ca-8b8e-9634c6b99f52");

        let store = store_id("prusa_store");
        assert_eq!(store.to_string(), "7565ddde-6c80-5f20-b473-d73210d55443");

        let link = purchase_link_id(
            size,
            store,
            "https://www.prusa3d.com/product/prusament-pla-galaxy-black-1kg/",
        );
        assert_eq!(link.to_string(), "27f32eda-2210-5990-9655-85185160b3f3");
    }

    #[test]
    fn derive_matches_concatenated_name() {
        let brand = brand_id("Prusament");
        let mut name = brand.as_bytes().to_vec();
        name.extend_from_slice(b"PLA");
        assert_eq!(
            derive(&NAMESPACE_MATERIAL, &[brand.into(), "PLA".into()]),
            Uuid::new_v5(&NAMESPACE_MATERIAL, &name)
        );
    }

    #[test]
    fn derived_ids_are_version_5() {
        assert_eq!(brand_id("Anything").get_version_num(), 5);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        let err = parse("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
        assert!(parse("ae5ff34e-298e-50c9-8f77-92a97fb30b09").is_ok());
    }

    // =========================================================================
    // Size key
    // =========================================================================

    #[test]
    fn size_key_minimal() {
        let e = entry(json!({"filament_weight": 1000}));
        assert_eq!(size_key(&e, 0), "1000g_1.75mm_idx:0");
    }

    #[test]
    fn size_key_keeps_float_rendering() {
        let e = entry(json!({"filament_weight": 1000.0, "diameter": 2.85}));
        assert_eq!(size_key(&e, 3), "1000.0g_2.85mm_idx:3");
    }

    #[test]
    fn format_float_is_positional_at_extremes() {
        assert_eq!(format_float(1e-7), "0.0000001");
        assert_eq!(format_float(1e16), "10000000000000000");
        assert_eq!(format_float(2.5e15), "2500000000000000.0");
    }

    #[test]
    fn size_key_integral_diameter() {
        let e = entry(json!({"filament_weight": 750, "diameter": 3}));
        assert_eq!(size_key(&e, 0), "750g_3mm_idx:0");
    }

    #[test]
    fn size_key_all_parts() {
        let e = entry(json!({
            "filament_weight": 1000,
            "diameter": 1.75,
            "gtin": "8594173675179",
            "spool_refill": true,
            "article_number": "PRM-1"
        }));
        assert_eq!(
            size_key(&e, 1),
            "1000g_1.75mm_gtin:8594173675179_refill_art:PRM-1_idx:1"
        );
    }

    #[test]
    fn size_key_falls_back_to_ean() {
        let e = entry(json!({"filament_weight": 500, "gtin": "", "ean": "1234567890123"}));
        assert_eq!(size_key(&e, 0), "500g_1.75mm_ean:1234567890123_idx:0");
    }

    #[test]
    fn size_key_skips_falsy_parts() {
        let e = entry(json!({
            "filament_weight": 500,
            "spool_refill": false,
            "article_number": null
        }));
        assert_eq!(size_key(&e, 2), "500g_1.75mm_idx:2");
    }

    #[test]
    fn identical_entries_differ_by_index() {
        let variant = variant_id(brand_id("X"), "Red");
        let e = entry(json!({"filament_weight": 1000, "diameter": 1.75}));
        assert_ne!(size_id(variant, &e, 0), size_id(variant, &e, 1));

        let with_gtin = entry(json!({"filament_weight": 1000, "gtin": "123456789012"}));
        assert_ne!(size_id(variant, &with_gtin, 0), size_id(variant, &with_gtin, 1));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!(1.5)));
    }
}
