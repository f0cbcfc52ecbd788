//! Typed views of the manifest files.
//!
//! Every field is optional and unknown keys are ignored: the crawler builds a
//! best-effort database and leaves strictness to the schema validator.
//! Defaults that belong to the data model (density, diameter, origin) are
//! applied by the crawler, not here.
//!
//! Fields are read leniently, one at a time. A value of the wrong JSON type
//! is coerced where the meaning is unambiguous (`55.5` for an integer
//! temperature, `12345` for an article number) and reads as unset otherwise,
//! so one bad field never discards the entity that holds it.

use crate::model::{
    AllSlicerSettings, ColorStandards, GenericSlicerSettings, SlicerIds, SlicerSettings,
    VariantTraits,
};
use serde::Deserialize;
use serde_json::Value;

/// A value that may be written as a single item or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    // Tried first: a list must not be swallowed by a `T` that accepts lists.
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Field deserializers that never fail on a type mismatch.
mod lenient {
    use serde::Deserialize;
    use serde::de::{DeserializeOwned, Deserializer};
    use serde_json::Value;

    /// Strings as-is, numbers in their JSON rendering.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Integers, with fractional numbers and numeric strings rounded.
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        if let Some(n) = value.as_i64() {
            return Ok(Some(n));
        }
        Ok(as_float(&value).map(|f| f.round() as i64))
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(as_float(&Value::deserialize(d)?))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(d)?.as_bool())
    }

    /// Any deserializable value; unset when the shape does not fit.
    pub fn nested<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        Ok(serde_json::from_value::<Option<T>>(value).ok().flatten())
    }

    /// A list whose unusable entries become `T::default()`, keeping positions.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect())
    }

    fn as_float(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite())
    }
}

/// Country list normalized to a vec; an empty string or list counts as unset.
fn country_list(value: Option<OneOrMany<String>>) -> Option<Vec<String>> {
    match value? {
        OneOrMany::One(s) if s.is_empty() => None,
        OneOrMany::Many(v) if v.is_empty() => None,
        other => Some(other.into_vec()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BrandDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub website: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub logo: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub origin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub storefront_url: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub logo: Option<String>,
    #[serde(deserialize_with = "lenient::nested")]
    pub ships_from: Option<OneOrMany<String>>,
    #[serde(deserialize_with = "lenient::nested")]
    pub ships_to: Option<OneOrMany<String>>,
}

impl StoreDoc {
    pub fn ships_from(&mut self) -> Vec<String> {
        country_list(self.ships_from.take()).unwrap_or_default()
    }

    pub fn ships_to(&mut self) -> Vec<String> {
        country_list(self.ships_to.take()).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MaterialDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub material: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub default_max_dry_temperature: Option<i64>,
    #[serde(deserialize_with = "lenient::nested")]
    pub default_slicer_settings: Option<SlicerSettingsDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilamentDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub density: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub diameter_tolerance: Option<f64>,
    #[serde(deserialize_with = "lenient::int")]
    pub max_dry_temperature: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub data_sheet_url: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub safety_sheet_url: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub discontinued: Option<bool>,
    #[serde(deserialize_with = "lenient::nested")]
    pub slicer_ids: Option<SlicerIdsDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub slicer_settings: Option<SlicerSettingsDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VariantDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub color_name: Option<String>,
    #[serde(deserialize_with = "lenient::nested")]
    pub color_hex: Option<OneOrMany<String>>,
    #[serde(deserialize_with = "lenient::nested")]
    pub hex_variants: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::nested")]
    pub color_standards: Option<ColorStandardsDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub traits: Option<TraitsDoc>,
    #[serde(deserialize_with = "lenient::flag")]
    pub discontinued: Option<bool>,
}

/// One entry of `sizes.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SizeDoc {
    #[serde(deserialize_with = "lenient::float")]
    pub filament_weight: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub diameter: Option<f64>,
    #[serde(deserialize_with = "lenient::int")]
    pub empty_spool_weight: Option<i64>,
    #[serde(deserialize_with = "lenient::float")]
    pub spool_core_diameter: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub gtin: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub ean: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub article_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub barcode_identifier: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub nfc_identifier: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub qr_identifier: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub discontinued: Option<bool>,
    #[serde(deserialize_with = "lenient::list")]
    pub purchase_links: Vec<PurchaseLinkDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PurchaseLinkDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub store_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub spool_refill: Option<bool>,
    #[serde(deserialize_with = "lenient::nested")]
    pub ships_from: Option<OneOrMany<String>>,
    #[serde(deserialize_with = "lenient::nested")]
    pub ships_to: Option<OneOrMany<String>>,
}

impl PurchaseLinkDoc {
    pub fn ships_from(&mut self) -> Option<Vec<String>> {
        country_list(self.ships_from.take())
    }

    pub fn ships_to(&mut self) -> Option<Vec<String>> {
        country_list(self.ships_to.take())
    }
}

// ============================================================================
// Nested documents
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlicerIdsDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub prusaslicer: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub bambustudio: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub orcaslicer: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub cura: Option<String>,
}

impl From<SlicerIdsDoc> for SlicerIds {
    fn from(doc: SlicerIdsDoc) -> Self {
        SlicerIds {
            prusaslicer: doc.prusaslicer,
            bambustudio: doc.bambustudio,
            orcaslicer: doc.orcaslicer,
            cura: doc.cura,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlicerProfileDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub profile_name: Option<String>,
    pub overrides: Option<Value>,
}

impl SlicerProfileDoc {
    /// A profile without a name carries no usable settings.
    fn into_settings(self) -> Option<SlicerSettings> {
        let profile_name = self.profile_name.filter(|n| !n.is_empty())?;
        Some(SlicerSettings {
            profile_name,
            overrides: self.overrides.filter(|v| !v.is_null()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenericSlicerDoc {
    #[serde(deserialize_with = "lenient::int")]
    pub first_layer_bed_temp: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub first_layer_nozzle_temp: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub bed_temp: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub nozzle_temp: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlicerSettingsDoc {
    #[serde(deserialize_with = "lenient::nested")]
    pub prusaslicer: Option<SlicerProfileDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub bambustudio: Option<SlicerProfileDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub orcaslicer: Option<SlicerProfileDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub cura: Option<SlicerProfileDoc>,
    #[serde(deserialize_with = "lenient::nested")]
    pub generic: Option<GenericSlicerDoc>,
}

impl From<SlicerSettingsDoc> for AllSlicerSettings {
    fn from(doc: SlicerSettingsDoc) -> Self {
        AllSlicerSettings {
            prusaslicer: doc.prusaslicer.and_then(SlicerProfileDoc::into_settings),
            bambustudio: doc.bambustudio.and_then(SlicerProfileDoc::into_settings),
            orcaslicer: doc.orcaslicer.and_then(SlicerProfileDoc::into_settings),
            cura: doc.cura.and_then(SlicerProfileDoc::into_settings),
            generic: doc.generic.map(|g| GenericSlicerSettings {
                first_layer_bed_temp: g.first_layer_bed_temp,
                first_layer_nozzle_temp: g.first_layer_nozzle_temp,
                bed_temp: g.bed_temp,
                nozzle_temp: g.nozzle_temp,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ColorStandardsDoc {
    #[serde(deserialize_with = "lenient::string")]
    pub ral: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub ncs: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub pantone: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub bs: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub munsell: Option<String>,
}

impl From<ColorStandardsDoc> for ColorStandards {
    fn from(doc: ColorStandardsDoc) -> Self {
        ColorStandards {
            ral: doc.ral,
            ncs: doc.ncs,
            pantone: doc.pantone,
            bs: doc.bs,
            munsell: doc.munsell,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraitsDoc {
    #[serde(deserialize_with = "lenient::flag")]
    pub translucent: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub glow: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub matte: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub recycled: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub recyclable: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub biodegradable: Option<bool>,
}

impl From<TraitsDoc> for VariantTraits {
    fn from(doc: TraitsDoc) -> Self {
        VariantTraits {
            translucent: doc.translucent.unwrap_or(false),
            glow: doc.glow.unwrap_or(false),
            matte: doc.matte.unwrap_or(false),
            recycled: doc.recycled.unwrap_or(false),
            recyclable: doc.recyclable.unwrap_or(false),
            biodegradable: doc.biodegradable.unwrap_or(false),
        }
    }
}
