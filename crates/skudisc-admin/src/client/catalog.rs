//! Product lookups: SKU search for bulk import, id lookups for the picker.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::json;

use skudisc_core::{CatalogResolver, ResolvedProduct, ResolvedVariant};

use super::AdminClient;
use crate::error::AdminError;
use crate::types::{NodesById, ProductNode, ProductsData, VariantNode};

const SEARCH_PRODUCTS_BY_SKU: &str = r"
query SearchProductsBySku($query: String!) {
  products(first: 250, query: $query) {
    nodes {
      id
      title
      featuredImage { url }
      variants(first: 100) {
        nodes { id sku price displayName }
      }
    }
  }
}";

const PRODUCTS_BY_ID: &str = r"
query ProductsById($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on Product {
      id
      title
      featuredImage { url }
      variants(first: 100) {
        nodes { id sku price displayName }
      }
    }
  }
}";

const VARIANTS_BY_ID: &str = r"
query VariantsById($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on ProductVariant {
      id
      sku
      price
      displayName
      product { id title featuredImage { url } }
    }
  }
}";

/// Builds the product search string `sku:"A" OR sku:"B"`, escaping quotes
/// and backslashes inside each SKU.
#[must_use]
pub fn sku_search_query(skus: &[String]) -> String {
    skus.iter()
        .map(|sku| {
            let escaped = sku.replace('\\', "\\\\").replace('"', "\\\"");
            format!("sku:\"{escaped}\"")
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn min_price(variants: &[VariantNode]) -> Option<String> {
    variants
        .iter()
        .filter_map(|v| {
            let raw = v.price.as_deref()?;
            raw.trim().parse::<Decimal>().ok().map(|d| (d, raw))
        })
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw.to_owned())
}

fn to_variant(node: VariantNode) -> ResolvedVariant {
    ResolvedVariant {
        id: node.id,
        sku: node.sku.filter(|s| !s.is_empty()),
        price: node.price,
        title: node.display_name,
    }
}

fn to_product(node: ProductNode) -> ResolvedProduct {
    let min_price = min_price(&node.variants.nodes);
    ResolvedProduct {
        id: node.id,
        title: node.title,
        image: node.featured_image.map(|i| i.url),
        min_price,
        variants: node.variants.nodes.into_iter().map(to_variant).collect(),
    }
}

/// Keeps only variants whose SKU was requested (ignoring case); products
/// left with no variant are dropped. Shopify's `sku:` search also matches
/// prefixes, so the raw result can contain near-misses.
fn retain_requested(products: Vec<ResolvedProduct>, skus: &[String]) -> Vec<ResolvedProduct> {
    products
        .into_iter()
        .filter_map(|mut product| {
            product.variants.retain(|v| {
                v.sku
                    .as_deref()
                    .is_some_and(|s| skus.iter().any(|r| r.eq_ignore_ascii_case(s)))
            });
            (!product.variants.is_empty()).then_some(product)
        })
        .collect()
}

impl AdminClient {
    /// Searches the catalog for products with a variant carrying one of
    /// `skus`. Only the matching variants are returned.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    pub async fn search_products_by_sku(
        &self,
        skus: &[String],
    ) -> Result<Vec<ResolvedProduct>, AdminError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }
        let data: ProductsData = self
            .execute(
                "SearchProductsBySku",
                SEARCH_PRODUCTS_BY_SKU,
                json!({ "query": sku_search_query(skus) }),
            )
            .await?;

        let products = retain_requested(
            data.products.nodes.into_iter().map(to_product).collect(),
            skus,
        );
        tracing::debug!(
            requested = skus.len(),
            products = products.len(),
            "sku search complete"
        );
        Ok(products)
    }

    /// Fetches whole products by GID with all their variants. Unknown ids
    /// are skipped.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    pub async fn products_by_id(&self, ids: &[String]) -> Result<Vec<ResolvedProduct>, AdminError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let data: NodesById<ProductNode> = self
            .execute("ProductsById", PRODUCTS_BY_ID, json!({ "ids": ids }))
            .await?;
        Ok(data.nodes.into_iter().flatten().map(to_product).collect())
    }

    /// Fetches variants by GID, grouped under their products in first-seen
    /// order. Unknown ids are skipped, as are variants returned without
    /// their product.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    pub async fn variants_by_id(&self, ids: &[String]) -> Result<Vec<ResolvedProduct>, AdminError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let data: NodesById<VariantNode> = self
            .execute("VariantsById", VARIANTS_BY_ID, json!({ "ids": ids }))
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, ResolvedProduct> = BTreeMap::new();
        for mut node in data.nodes.into_iter().flatten() {
            let Some(product) = node.product.take() else {
                continue;
            };
            let entry = grouped.entry(product.id.clone()).or_insert_with(|| {
                order.push(product.id.clone());
                ResolvedProduct {
                    id: product.id,
                    title: product.title,
                    image: product.featured_image.map(|i| i.url),
                    min_price: None,
                    variants: Vec::new(),
                }
            });
            entry.variants.push(to_variant(node));
        }

        Ok(order
            .into_iter()
            .filter_map(|id| grouped.remove(&id))
            .collect())
    }
}

impl CatalogResolver for AdminClient {
    type Error = AdminError;

    async fn resolve_skus(&self, skus: &[String]) -> Result<Vec<ResolvedProduct>, AdminError> {
        self.search_products_by_sku(skus).await
    }
}
