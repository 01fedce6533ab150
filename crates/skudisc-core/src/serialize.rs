//! Persisted configuration JSON.
//!
//! `serialize` always writes the current shape:
//!
//! ```json
//! {
//!   "discount_code": "SUMMER",
//!   "sku_discounts":   { "<identifier>": { "discount_type": "fixedAmount", "value": 5, "applies_to_each_item": true } },
//!   "product_details": { "<identifier>": { "title": "...", "sku": "...", "image": null, "price": "19.99",
//!                                          "value": 5, "discountType": "fixedAmount", "id": "...",
//!                                          "variantId": "...", "productId": "..." } }
//! }
//! ```
//!
//! `deserialize` accepts that plus two older shapes still found on stores:
//!
//! - **Legacy B**: `sku_discounts` entries are `{discount_type, value}` and
//!   there is no `product_details`.
//! - **Legacy A**: `sku_discounts` is a flat `sku -> number` map, always a
//!   percentage. This is also what the discount function reads.
//!
//! Shapes are tried in that order (current, B, A), each as its own strict
//! decode. Legacy records carry no catalog data; see
//! [`Configuration::unresolved_skus`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::configuration::Configuration;
use crate::discount::{DiscountRecord, DiscountType};
use crate::error::ReconcileError;

/// Pricing-engine view of one configured identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuDiscount {
    pub discount_type: DiscountType,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to_each_item: Option<bool>,
}

/// UI view of one configured identifier, used to redisplay the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub title: String,
    pub sku: String,
    pub image: Option<String>,
    pub price: Option<String>,
    pub value: f64,
    #[serde(rename = "discountType")]
    pub discount_type: DiscountType,
    pub id: String,
    #[serde(rename = "variantId", default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(rename = "productId", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// The current persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfiguration {
    pub discount_code: String,
    pub sku_discounts: BTreeMap<String, SkuDiscount>,
    pub product_details: BTreeMap<String, ProductDetails>,
}

/// Which stored shape a configuration was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredShape {
    Current,
    LegacyB,
    LegacyA,
}

// ---------------------------------------------------------------------------
// Decode-side shapes. These are more forgiving than the write-side types
// because older editor builds wrote `null` or omitted fields.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CurrentDoc {
    #[serde(default)]
    discount_code: String,
    #[serde(default)]
    sku_discounts: BTreeMap<String, StoredSkuDiscount>,
    product_details: BTreeMap<String, StoredDetails>,
}

#[derive(Debug, Deserialize)]
struct LegacyBDoc {
    #[serde(default)]
    discount_code: String,
    sku_discounts: BTreeMap<String, StoredSkuDiscount>,
}

#[derive(Debug, Deserialize)]
struct LegacyADoc {
    #[serde(default)]
    discount_code: String,
    sku_discounts: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct StoredSkuDiscount {
    #[serde(default, deserialize_with = "lenient_type")]
    discount_type: DiscountType,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct StoredDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    price: Option<String>,
    #[serde(default, deserialize_with = "lenient_value")]
    value: f64,
    #[serde(rename = "discountType", default, deserialize_with = "lenient_type")]
    discount_type: DiscountType,
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "variantId", default)]
    variant_id: Option<String>,
    #[serde(rename = "productId", default)]
    product_id: Option<String>,
}

/// Unknown or missing types read as percentage, the editor's default.
fn lenient_type<'de, D: Deserializer<'de>>(d: D) -> Result<DiscountType, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(DiscountType::parse).unwrap_or_default())
}

/// Prices were written both as decimal strings and as bare numbers.
fn lenient_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A non-numeric detail value reads as `0`.
fn lenient_value<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<serde_json::Value>::deserialize(d)?
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0))
}

/// Projects a configuration into the current persisted shape.
#[must_use]
pub fn serialize(configuration: &Configuration) -> PersistedConfiguration {
    let mut sku_discounts = BTreeMap::new();
    let mut product_details = BTreeMap::new();

    for record in configuration.records() {
        sku_discounts.insert(
            record.identifier.clone(),
            SkuDiscount {
                discount_type: record.discount_type,
                value: record.discount_value,
                applies_to_each_item: (record.discount_type == DiscountType::FixedAmount)
                    .then_some(true),
            },
        );
        product_details.insert(
            record.identifier.clone(),
            ProductDetails {
                title: record.title.clone(),
                sku: record.sku.clone(),
                image: record.image.clone(),
                price: record.price.clone(),
                value: record.discount_value,
                discount_type: record.discount_type,
                id: record
                    .variant_id
                    .clone()
                    .or_else(|| record.product_id.clone())
                    .unwrap_or_else(|| record.identifier.clone()),
                variant_id: record.variant_id.clone(),
                product_id: record.product_id.clone(),
            },
        );
    }

    PersistedConfiguration {
        discount_code: configuration.discount_code.clone(),
        sku_discounts,
        product_details,
    }
}

/// Serializes a configuration to the JSON string stored in the metafield.
///
/// # Errors
///
/// Returns [`ReconcileError::PersistFailed`] if JSON encoding fails.
pub fn to_json(configuration: &Configuration) -> Result<String, ReconcileError> {
    serde_json::to_string(&serialize(configuration)).map_err(|e| ReconcileError::PersistFailed {
        source: Box::new(e),
    })
}

/// Decodes a stored configuration in any supported shape.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedConfiguration`] when `json` is not
/// valid JSON or matches none of the supported shapes.
pub fn deserialize(json: &str) -> Result<Configuration, ReconcileError> {
    deserialize_with_shape(json).map(|(config, _)| config)
}

/// Like [`deserialize`], also reporting which shape was found.
///
/// # Errors
///
/// See [`deserialize`].
pub fn deserialize_with_shape(json: &str) -> Result<(Configuration, StoredShape), ReconcileError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ReconcileError::MalformedConfiguration {
            reason: e.to_string(),
        })?;

    if let Ok(doc) = serde_json::from_value::<CurrentDoc>(value.clone()) {
        return Ok((from_current(doc), StoredShape::Current));
    }
    if let Ok(doc) = serde_json::from_value::<LegacyBDoc>(value.clone()) {
        tracing::warn!(records = doc.sku_discounts.len(), "loaded legacy configuration without product details");
        return Ok((from_legacy_b(doc), StoredShape::LegacyB));
    }
    match serde_json::from_value::<LegacyADoc>(value) {
        Ok(doc) => {
            tracing::warn!(records = doc.sku_discounts.len(), "loaded legacy flat percentage configuration");
            Ok((from_legacy_a(doc), StoredShape::LegacyA))
        }
        Err(e) => Err(ReconcileError::MalformedConfiguration {
            reason: format!("unrecognized configuration shape: {e}"),
        }),
    }
}

fn from_current(doc: CurrentDoc) -> Configuration {
    let mut config = Configuration::new(doc.discount_code);
    let mut pricing = doc.sku_discounts;

    for (identifier, details) in doc.product_details {
        let (discount_type, value) = match pricing.remove(&identifier) {
            Some(entry) => (entry.discount_type, entry.value),
            None => (details.discount_type, details.value),
        };
        // Older editors stored only `id`; keep it when it names a product.
        let product_id = details.product_id.or_else(|| {
            details
                .id
                .filter(|id| id.contains("/Product/") && details.variant_id.is_none())
        });
        let record = DiscountRecord {
            sku: details.sku.unwrap_or_default(),
            title: details.title.unwrap_or_else(|| identifier.clone()),
            image: details.image,
            price: details.price,
            discount_type,
            discount_value: bounded(&identifier, discount_type, value),
            variant_id: details.variant_id.filter(|v| !v.is_empty()),
            product_id: product_id.filter(|p| !p.is_empty()),
            identifier,
        };
        config.insert(record);
    }

    // Pricing entries without display details came from a partial write.
    for (identifier, entry) in pricing {
        config.insert(sku_only_record(identifier, entry.discount_type, entry.value));
    }
    config
}

fn from_legacy_b(doc: LegacyBDoc) -> Configuration {
    let mut config = Configuration::new(doc.discount_code);
    for (sku, entry) in doc.sku_discounts {
        config.insert(sku_only_record(sku, entry.discount_type, entry.value));
    }
    config
}

fn from_legacy_a(doc: LegacyADoc) -> Configuration {
    let mut config = Configuration::new(doc.discount_code);
    for (sku, value) in doc.sku_discounts {
        config.insert(sku_only_record(sku, DiscountType::Percentage, value));
    }
    config
}

fn sku_only_record(sku: String, discount_type: DiscountType, value: f64) -> DiscountRecord {
    DiscountRecord {
        identifier: sku.clone(),
        title: sku.clone(),
        discount_value: bounded(&sku, discount_type, value),
        sku,
        image: None,
        price: None,
        discount_type,
        variant_id: None,
        product_id: None,
    }
}

fn bounded(identifier: &str, discount_type: DiscountType, value: f64) -> f64 {
    if discount_type.is_in_range(value) {
        return value;
    }
    let clamped = discount_type.clamp(value);
    tracing::warn!(identifier, value, clamped, "stored discount value out of range; clamping");
    clamped
}

#[cfg(test)]
#[path = "serialize_test.rs"]
mod tests;
