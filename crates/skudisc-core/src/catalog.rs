//! Boundary with the product catalog and the metafield store.
//!
//! The reconciler never builds GraphQL itself. It consumes resolved product
//! records through [`CatalogResolver`] and reads/writes the persisted JSON
//! through [`MetafieldStore`]; `skudisc-admin` implements both against the
//! Shopify Admin API.

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;
use crate::discount::{DiscountRecord, DiscountType};
use crate::error::ReconcileError;
use crate::import::ImportBatch;

/// SKUs per catalog query. Longer `sku:"A" OR sku:"B"` search strings hit
/// the Admin API's query length limit.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// A product as returned by the catalog, with the variants that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProduct {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Lowest variant price, used when a whole product is picked.
    #[serde(default)]
    pub min_price: Option<String>,
    #[serde(default)]
    pub variants: Vec<ResolvedVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVariant {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    /// Variant display name, e.g. `"Jersey Frame - Black / 16x20"`.
    #[serde(default)]
    pub title: Option<String>,
}

/// Resolves merchant SKUs to catalog products.
pub trait CatalogResolver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns every product having at least one variant whose SKU is in
    /// `skus`. Unknown SKUs are simply absent from the result.
    fn resolve_skus(
        &self,
        skus: &[String],
    ) -> impl Future<Output = Result<Vec<ResolvedProduct>, Self::Error>> + Send;
}

/// Reads and writes the configuration JSON blob for one discount, scoped to
/// a fixed `(namespace, key)` pair.
pub trait MetafieldStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read(&self) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    fn write(&self, json: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Splits `skus` into lookup chunks of at most `chunk_size` (minimum 1).
#[must_use]
pub fn chunk_skus(skus: &[String], chunk_size: usize) -> Vec<Vec<String>> {
    skus.chunks(chunk_size.max(1)).map(<[String]>::to_vec).collect()
}

/// Resolves `skus` chunk by chunk with up to `concurrency` lookups in flight,
/// collecting every chunk before returning.
///
/// # Errors
///
/// Returns [`ReconcileError::CatalogLookupFailed`] if any chunk fails; no
/// partial result is returned.
pub async fn resolve_in_chunks<R>(
    resolver: &R,
    skus: &[String],
    chunk_size: usize,
    concurrency: usize,
) -> Result<Vec<ResolvedProduct>, ReconcileError>
where
    R: CatalogResolver + Sync,
{
    let chunks = chunk_skus(skus, chunk_size);
    let chunk_count = chunks.len();

    let per_chunk: Vec<Vec<ResolvedProduct>> = stream::iter(chunks)
        .enumerate()
        .map(|(index, chunk)| async move {
            tracing::debug!(chunk = index + 1, of = chunk_count, skus = chunk.len(), "resolving catalog chunk");
            resolver.resolve_skus(&chunk).await
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
        .map_err(|e| ReconcileError::CatalogLookupFailed {
            source: Box::new(e),
        })?;

    Ok(per_chunk.into_iter().flatten().collect())
}

/// Builds one record per catalog variant whose SKU was requested in `batch`,
/// carrying the batch's value and discount type.
#[must_use]
pub fn import_records(products: &[ResolvedProduct], batch: &ImportBatch) -> Vec<DiscountRecord> {
    let mut records = Vec::new();
    for product in products {
        for variant in &product.variants {
            let Some(sku) = variant.sku.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let Some(entry) = batch.entry_for(sku) else {
                continue;
            };
            records.push(
                DiscountRecord::new(sku, product.title.clone(), batch.discount_type, entry.value)
                    .with_catalog(
                        Some(variant.id.clone()),
                        Some(product.id.clone()),
                        product.image.clone(),
                        variant.price.clone(),
                    ),
            );
        }
    }
    records
}

/// Builds records from a product-picker selection: one per selected variant,
/// or one for the whole product when no variants were selected. Picked
/// records start at value `0`.
#[must_use]
pub fn picked_records(
    selection: &[ResolvedProduct],
    discount_type: DiscountType,
) -> Vec<DiscountRecord> {
    let mut records = Vec::new();
    for product in selection {
        if product.variants.is_empty() {
            records.push(
                DiscountRecord::new("", product.title.clone(), discount_type, 0.0).with_catalog(
                    None,
                    Some(product.id.clone()),
                    product.image.clone(),
                    product.min_price.clone(),
                ),
            );
            continue;
        }
        for variant in &product.variants {
            let title = variant
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("{} - Variant", product.title));
            records.push(
                DiscountRecord::new(variant.sku.clone().unwrap_or_default(), title, discount_type, 0.0)
                    .with_catalog(
                        Some(variant.id.clone()),
                        Some(product.id.clone()),
                        product.image.clone(),
                        variant.price.clone(),
                    ),
            );
        }
    }
    records
}

/// Fills in title, image, price and product id for records that have a SKU
/// but no price, matching catalog variants by SKU (ignoring case). Discount
/// values and identifiers are left alone. Returns how many records changed.
pub fn refresh_details(configuration: &mut Configuration, products: &[ResolvedProduct]) -> usize {
    let mut refreshed = 0;
    for record in configuration.records_mut() {
        if record.sku.is_empty() || record.price.is_some() {
            continue;
        }
        let matched = products.iter().find_map(|p| {
            p.variants
                .iter()
                .find(|v| v.sku.as_deref().is_some_and(|s| record.has_sku(s)))
                .map(|v| (p, v))
        });
        if let Some((product, variant)) = matched {
            record.title.clone_from(&product.title);
            record.image.clone_from(&product.image);
            record.price.clone_from(&variant.price);
            record.product_id = Some(product.id.clone());
            refreshed += 1;
        }
    }
    refreshed
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
