//! What the discount function does with a saved configuration at checkout:
//! one discount candidate per cart line whose SKU has a configured entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::discount::DiscountType;
use crate::serialize::{PersistedConfiguration, SkuDiscount};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CandidateValue {
    Percentage { value: f64 },
    FixedAmount { amount: f64, applies_to_each_item: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCandidate {
    pub line_id: String,
    pub message: String,
    pub value: CandidateValue,
}

/// Pricing entries by SKU. An entry keyed by SKU (legacy shapes) matches
/// directly; an entry keyed by variant or product id matches through the
/// SKU recorded in its product details. Direct keys win.
fn entries_by_sku(persisted: &PersistedConfiguration) -> BTreeMap<&str, &SkuDiscount> {
    let mut index = BTreeMap::new();
    for (key, entry) in &persisted.sku_discounts {
        if let Some(sku) = persisted
            .product_details
            .get(key)
            .map(|d| d.sku.as_str())
            .filter(|s| !s.is_empty() && *s != key.as_str())
        {
            index.entry(sku).or_insert(entry);
        }
    }
    for (key, entry) in &persisted.sku_discounts {
        index.insert(key.as_str(), entry);
    }
    index
}

/// Builds the discount candidates for `lines`. Lines without a SKU, lines
/// whose SKU has no entry, and entries whose value is still `0` produce
/// nothing.
#[must_use]
pub fn evaluate(persisted: &PersistedConfiguration, lines: &[CartLine]) -> Vec<DiscountCandidate> {
    let index = entries_by_sku(persisted);
    lines
        .iter()
        .filter_map(|line| {
            let entry = index.get(line.sku.as_deref()?)?;
            let value = entry.value;
            if value <= 0.0 {
                return None;
            }
            Some(match entry.discount_type {
                DiscountType::Percentage => DiscountCandidate {
                    line_id: line.id.clone(),
                    message: format!("{value}% OFF"),
                    value: CandidateValue::Percentage { value },
                },
                DiscountType::FixedAmount => DiscountCandidate {
                    line_id: line.id.clone(),
                    message: format!("${value} OFF"),
                    value: CandidateValue::FixedAmount {
                        amount: value,
                        applies_to_each_item: entry.applies_to_each_item.unwrap_or(false),
                    },
                },
            })
        })
        .collect()
}
