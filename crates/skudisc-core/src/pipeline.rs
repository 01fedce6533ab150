//! Bulk import end to end: parse, validate, resolve, merge.

use crate::catalog::{self, CatalogResolver, DEFAULT_CHUNK_SIZE};
use crate::configuration::Configuration;
use crate::discount::DiscountType;
use crate::error::ReconcileError;
use crate::import;
use crate::merge::{self, MergeResult};

/// How catalog lookups are split up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    pub chunk_size: usize,
    /// Chunks in flight at once. `1` resolves chunks sequentially.
    pub concurrency: usize,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 1,
        }
    }
}

/// Imports pasted `SKU, value` lines into a copy of `configuration`.
///
/// Validation runs first and is all-or-nothing; the catalog is only
/// queried for a fully valid batch, and merging only happens once every
/// chunk has been resolved.
///
/// # Errors
///
/// - [`ReconcileError::Validation`] / [`ReconcileError::EmptyBatch`] for bad
///   input (no catalog call is made).
/// - [`ReconcileError::CatalogLookupFailed`] if any lookup chunk fails.
pub async fn bulk_import<R>(
    configuration: &Configuration,
    raw: &str,
    discount_type: DiscountType,
    resolver: &R,
    options: LookupOptions,
) -> Result<(Configuration, MergeResult), ReconcileError>
where
    R: CatalogResolver + Sync,
{
    let batch = import::parse_batch(raw, discount_type)?;
    tracing::info!(
        skus = batch.entries.len(),
        discount_type = %discount_type,
        "bulk import validated; resolving SKUs"
    );

    let products = catalog::resolve_in_chunks(
        resolver,
        &batch.skus(),
        options.chunk_size,
        options.concurrency,
    )
    .await?;

    let records = catalog::import_records(&products, &batch);
    Ok(merge::merge(configuration, records, &batch.requested_skus()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LineError, LineErrorKind};
    use crate::testing::{product, FakeCatalog};

    #[tokio::test]
    async fn invalid_batch_makes_no_catalog_call() {
        let catalog = FakeCatalog::new(vec![product(1, "Frame", &[("SKU1", "10.00")])]);
        let err = bulk_import(
            &Configuration::new("SUMMER"),
            "SKU1\t10\nSKU2,20\nbad line\nSKU3:105",
            DiscountType::Percentage,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(catalog.calls(), 0);
        match err {
            ReconcileError::Validation(errors) => assert_eq!(
                errors,
                vec![
                    LineError::new(3, LineErrorKind::InvalidFormat),
                    LineError::new(4, LineErrorKind::PercentageOutOfRange),
                ]
            ),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn partially_resolved_batch_reports_not_found() {
        let catalog = FakeCatalog::new(vec![product(1, "Frame", &[("SKU1", "10.00")])]);
        let (config, result) = bulk_import(
            &Configuration::new("SUMMER"),
            "SKU1\t10\nSKU2,20",
            DiscountType::Percentage,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.added_count, 1);
        assert_eq!(result.not_found_skus.iter().collect::<Vec<_>>(), vec!["SKU2"]);
        assert!(result.already_present_skus.is_empty());
        let rec = config.find_by_sku("SKU1").unwrap();
        assert!((rec.discount_value - 10.0).abs() < f64::EPSILON);
        assert_eq!(rec.discount_type, DiscountType::Percentage);
    }

    #[tokio::test]
    async fn second_import_of_same_sku_is_already_present() {
        let catalog = FakeCatalog::new(vec![product(1, "Frame", &[("SKU1", "10.00")])]);
        let (config, _) = bulk_import(
            &Configuration::new("SUMMER"),
            "SKU1,10",
            DiscountType::Percentage,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap();
        let (again, result) = bulk_import(
            &config,
            "SKU1,80",
            DiscountType::Percentage,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.added_count, 0);
        assert_eq!(result.already_present_skus.iter().collect::<Vec<_>>(), vec!["SKU1"]);
        let value = again.find_by_sku("SKU1").unwrap().discount_value;
        assert!((value - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn fixed_amount_batch_records_carry_the_type() {
        let catalog = FakeCatalog::new(vec![product(1, "Frame", &[("SKU1", "10.00")])]);
        let (config, _) = bulk_import(
            &Configuration::new("SUMMER"),
            "SKU1 150",
            DiscountType::FixedAmount,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap();
        let rec = config.find_by_sku("SKU1").unwrap();
        assert_eq!(rec.discount_type, DiscountType::FixedAmount);
        assert!((rec.discount_value - 150.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_lookup_leaves_configuration_untouched() {
        let mut catalog = FakeCatalog::new(vec![product(1, "Frame", &[("SKU1", "10.00")])]);
        catalog.fail_on_call = Some(1);
        let original = Configuration::new("SUMMER");
        let err = bulk_import(
            &original,
            "SKU1,10",
            DiscountType::Percentage,
            &catalog,
            LookupOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReconcileError::CatalogLookupFailed { .. }));
        assert!(original.is_empty());
    }
}
