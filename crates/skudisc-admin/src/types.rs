//! Shopify Admin GraphQL response types.
//!
//! Every response is wrapped in `{"data": ..., "errors": [...]}`; a query can
//! return partial `data` alongside `errors`, and throttled requests come back
//! as HTTP 200 with a `THROTTLED` error code. [`GraphQlResponse`] captures the
//! envelope generically. Connections are read through `nodes`, not `edges`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skudisc_core::listing::DiscountStatus;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphQlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphQlError {
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|e| e.code.as_deref())
            == Some("THROTTLED")
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Nodes<T> {
    #[serde(default)]
    pub nodes: Vec<T>,
}

/// `{field, message}` entry on a mutation payload.
#[derive(Debug, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    #[must_use]
    pub fn describe(&self) -> String {
        match self.field.as_deref() {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPayload {
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Nodes<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub featured_image: Option<Image>,
    #[serde(default = "empty_variants")]
    pub variants: Nodes<VariantNode>,
}

fn empty_variants() -> Nodes<VariantNode> {
    Nodes { nodes: Vec::new() }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Decimal string such as `"19.99"`.
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub product: Option<VariantProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantProduct {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub featured_image: Option<Image>,
}

/// `nodes(ids:)` lookups return `null` for unknown ids and only fill the
/// fields of the matching fragment.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct NodesById<T> {
    #[serde(default)]
    pub nodes: Vec<Option<T>>,
}

// ---------------------------------------------------------------------------
// Discount metafield
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountMetafieldData {
    pub discount_node: Option<MetafieldOwner>,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldOwner {
    #[serde(default)]
    pub metafield: Option<MetafieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldsSetData {
    pub metafields_set: Option<MutationPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldsSetInput<'a> {
    pub owner_id: &'a str,
    pub namespace: &'a str,
    pub key: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldDefinitionsData {
    pub metafield_definitions: Nodes<IdNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldDefinitionCreateData {
    pub metafield_definition_create: Option<DefinitionCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionCreatePayload {
    #[serde(default)]
    pub created_definition: Option<IdNode>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct IdNode {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Discounts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountNodesData {
    pub discount_nodes: Connection<DiscountNodeItem>,
}

/// A paged GraphQL connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscountNodeItem {
    pub id: String,
    pub discount: DiscountBody,
}

/// Only app discounts carry a function; basic discounts fall into `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum DiscountBody {
    DiscountAutomaticApp(AppDiscountFields),
    DiscountCodeApp(AppDiscountFields),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiscountFields {
    pub title: String,
    pub status: DiscountStatus,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub async_usage_count: u64,
    #[serde(default)]
    pub app_discount_type: Option<AppDiscountType>,
    #[serde(default)]
    pub codes: Option<Nodes<RedeemCode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiscountType {
    #[serde(default)]
    pub function_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemCode {
    pub code: String,
}

/// Activation mutations alias their payload field to `payload` so one type
/// covers all four of them.
#[derive(Debug, Deserialize)]
pub struct ActivationData {
    pub payload: Option<MutationPayload>,
}
