use std::collections::BTreeMap;

use crate::discount::{DiscountRecord, DiscountType};
use crate::error::ReconcileError;

/// Full discount configuration for one discount resource.
///
/// Records are keyed by [`DiscountRecord::identifier`]; no two records share
/// one, and every stored value satisfies its type's bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub discount_code: String,
    records: BTreeMap<String, DiscountRecord>,
}

impl Configuration {
    #[must_use]
    pub fn new(discount_code: impl Into<String>) -> Self {
        Self {
            discount_code: discount_code.into(),
            records: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&DiscountRecord> {
        self.records.get(identifier)
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    /// Records ordered by identifier.
    pub fn records(&self) -> impl Iterator<Item = &DiscountRecord> {
        self.records.values()
    }

    /// First record whose SKU matches `sku`, ignoring case.
    #[must_use]
    pub fn find_by_sku(&self, sku: &str) -> Option<&DiscountRecord> {
        self.records.values().find(|r| r.has_sku(sku))
    }

    /// Inserts `record` unless its identifier is taken. The value is clamped
    /// into its type's bound on the way in.
    ///
    /// Returns `false` (and leaves the configuration untouched) on collision.
    pub fn insert(&mut self, mut record: DiscountRecord) -> bool {
        if self.records.contains_key(&record.identifier) {
            return false;
        }
        if !record.discount_type.is_in_range(record.discount_value) {
            let clamped = record.discount_type.clamp(record.discount_value);
            tracing::warn!(
                identifier = %record.identifier,
                value = record.discount_value,
                clamped,
                "discount value out of range; clamping"
            );
            record.discount_value = clamped;
        }
        self.records.insert(record.identifier.clone(), record);
        true
    }

    pub fn remove(&mut self, identifier: &str) -> Option<DiscountRecord> {
        self.records.remove(identifier)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Sets a record's discount value, clamped into its type's bound.
    /// Returns the value actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRecord`] if no record has `identifier`.
    pub fn set_value(&mut self, identifier: &str, value: f64) -> Result<f64, ReconcileError> {
        let record = self.record_mut(identifier)?;
        record.discount_value = record.discount_type.clamp(value);
        Ok(record.discount_value)
    }

    /// Changes a record's discount type and re-clamps its value.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRecord`] if no record has `identifier`.
    pub fn set_type(
        &mut self,
        identifier: &str,
        discount_type: DiscountType,
    ) -> Result<(), ReconcileError> {
        let record = self.record_mut(identifier)?;
        record.discount_type = discount_type;
        record.discount_value = discount_type.clamp(record.discount_value);
        Ok(())
    }

    /// SKU records with no catalog price yet, typically loaded from a legacy
    /// shape. Callers re-resolve these to restore display data.
    #[must_use]
    pub fn unresolved_skus(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|r| !r.sku.is_empty() && r.price.is_none())
            .map(|r| r.sku.clone())
            .collect()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut DiscountRecord> {
        self.records.values_mut()
    }

    fn record_mut(&mut self, identifier: &str) -> Result<&mut DiscountRecord, ReconcileError> {
        self.records
            .get_mut(identifier)
            .ok_or_else(|| ReconcileError::UnknownRecord(identifier.to_owned()))
    }
}
