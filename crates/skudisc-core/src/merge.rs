//! Merging resolved catalog records into an existing configuration.
//!
//! Merges only ever add. A record whose identity is already configured is
//! skipped so that a re-import never overwrites a discount the merchant has
//! since edited.

use std::collections::BTreeSet;

use crate::configuration::Configuration;
use crate::discount::{resolve_identifier, DiscountRecord};

/// Outcome of a bulk-import merge, keyed by the SKUs as the merchant typed
/// them. `added_skus`, `not_found_skus` and `already_present_skus` are
/// pairwise disjoint and together equal the requested set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Records added. Can exceed `added_skus.len()` when one SKU matches
    /// several catalog variants.
    pub added_count: usize,
    pub added_skus: BTreeSet<String>,
    pub not_found_skus: BTreeSet<String>,
    pub already_present_skus: BTreeSet<String>,
}

impl MergeResult {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.added_count > 0
    }

    /// Merchant-facing warnings, in the order the import screen lists them.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.added_count == 0 && self.already_present_skus.is_empty() && !self.not_found_skus.is_empty() {
            warnings.push(format!(
                "None of the SKUs were found in your store: {}",
                join(&self.not_found_skus)
            ));
            return warnings;
        }
        if self.added_count == 0 && self.not_found_skus.is_empty() && !self.already_present_skus.is_empty() {
            warnings.push("All SKUs are already in the product list".to_owned());
            return warnings;
        }
        if !self.not_found_skus.is_empty() {
            warnings.push(format!("SKUs not found: {}", join(&self.not_found_skus)));
        }
        if !self.already_present_skus.is_empty() {
            warnings.push(format!(
                "SKUs already in list: {}",
                join(&self.already_present_skus)
            ));
        }
        warnings
    }
}

fn join(skus: &BTreeSet<String>) -> String {
    skus.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Outcome of adding product-picker records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickResult {
    pub added: usize,
    /// Display titles of picks that were already configured.
    pub duplicates: Vec<String>,
}

/// `true` when `record` is already configured, by identifier or by SKU.
fn is_present(configuration: &Configuration, record: &DiscountRecord) -> bool {
    configuration.contains(&record.identifier)
        || (!record.sku.is_empty() && configuration.find_by_sku(&record.sku).is_some())
}

/// Merges resolved bulk-import records into a copy of `configuration`.
///
/// Records whose SKU matches none of `requested_skus` are ignored. Existing
/// records are never modified.
#[must_use]
pub fn merge(
    configuration: &Configuration,
    resolved: Vec<DiscountRecord>,
    requested_skus: &BTreeSet<String>,
) -> (Configuration, MergeResult) {
    let mut merged = configuration.clone();
    let mut result = MergeResult::default();
    let mut matched: BTreeSet<String> = BTreeSet::new();

    for mut record in resolved {
        let Some(requested) = requested_skus.iter().find(|r| record.has_sku(r)) else {
            tracing::debug!(sku = %record.sku, "ignoring catalog record for an unrequested SKU");
            continue;
        };
        matched.insert(requested.clone());
        record.identifier = resolve_identifier(&record);

        if is_present(&merged, &record) {
            continue;
        }
        if merged.insert(record) {
            result.added_count += 1;
            result.added_skus.insert(requested.clone());
        }
    }

    result.not_found_skus = requested_skus.difference(&matched).cloned().collect();
    result.already_present_skus = matched.difference(&result.added_skus).cloned().collect();

    if !result.not_found_skus.is_empty() {
        tracing::warn!(
            skus = %join(&result.not_found_skus),
            "bulk import SKUs not found in catalog"
        );
    }
    tracing::info!(
        added = result.added_count,
        not_found = result.not_found_skus.len(),
        already_present = result.already_present_skus.len(),
        "merged bulk import"
    );

    (merged, result)
}

/// Adds product-picker records to a copy of `configuration`, skipping any
/// that are already configured.
#[must_use]
pub fn add_picked(
    configuration: &Configuration,
    picked: Vec<DiscountRecord>,
) -> (Configuration, PickResult) {
    let mut merged = configuration.clone();
    let mut result = PickResult::default();

    for mut record in picked {
        record.identifier = resolve_identifier(&record);
        if is_present(&merged, &record) {
            result.duplicates.push(record.title.clone());
            continue;
        }
        if merged.insert(record) {
            result.added += 1;
        }
    }

    (merged, result)
}
