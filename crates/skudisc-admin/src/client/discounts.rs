use serde_json::json;

use skudisc_core::listing::{DiscountKind, DiscountSummary};

use super::{check_user_errors, AdminClient};
use crate::error::AdminError;
use crate::types::{ActivationData, AppDiscountFields, DiscountBody, DiscountNodeItem, DiscountNodesData};

/// Discount nodes per page.
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched by [`AdminClient::list_discounts`].
const MAX_PAGES: usize = 50;

const LIST_DISCOUNTS: &str = r"
query AppDiscounts($first: Int!, $after: String) {
  discountNodes(first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      discount {
        __typename
        ... on DiscountAutomaticApp {
          title status startsAt endsAt createdAt asyncUsageCount
          appDiscountType { functionId }
        }
        ... on DiscountCodeApp {
          title status startsAt endsAt createdAt asyncUsageCount
          codes(first: 1) { nodes { code } }
          appDiscountType { functionId }
        }
      }
    }
  }
}";

fn summary(id: String, kind: DiscountKind, fields: AppDiscountFields) -> DiscountSummary {
    DiscountSummary {
        discount_id: id,
        title: fields.title,
        status: fields.status,
        kind,
        starts_at: fields.starts_at,
        ends_at: fields.ends_at,
        created_at: fields.created_at,
        async_usage_count: fields.async_usage_count,
        code: fields
            .codes
            .and_then(|c| c.nodes.into_iter().next())
            .map(|c| c.code),
        function_id: fields.app_discount_type.and_then(|t| t.function_id),
    }
}

fn to_summary(node: DiscountNodeItem) -> Option<DiscountSummary> {
    match node.discount {
        DiscountBody::DiscountAutomaticApp(fields) => {
            Some(summary(node.id, DiscountKind::AutomaticApp, fields))
        }
        DiscountBody::DiscountCodeApp(fields) => Some(summary(node.id, DiscountKind::CodeApp, fields)),
        DiscountBody::Other => None,
    }
}

fn activation_mutation(kind: DiscountKind, active: bool) -> &'static str {
    match (kind, active) {
        (DiscountKind::AutomaticApp, true) => "discountAutomaticActivate",
        (DiscountKind::AutomaticApp, false) => "discountAutomaticDeactivate",
        (DiscountKind::CodeApp, true) => "discountCodeActivate",
        (DiscountKind::CodeApp, false) => "discountCodeDeactivate",
    }
}

impl AdminClient {
    /// Lists the shop's app discounts, following `discountNodes` pages until
    /// the last one (at most `MAX_PAGES`). Basic and non-app discounts are
    /// left out.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    pub async fn list_discounts(&self) -> Result<Vec<DiscountSummary>, AdminError> {
        let mut discounts = Vec::new();
        let mut after: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let data: DiscountNodesData = self
                .execute(
                    "AppDiscounts",
                    LIST_DISCOUNTS,
                    json!({ "first": PAGE_SIZE, "after": after }),
                )
                .await?;
            let connection = data.discount_nodes;
            discounts.extend(connection.nodes.into_iter().filter_map(to_summary));

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => {
                    if page == MAX_PAGES {
                        tracing::warn!(pages = MAX_PAGES, "discount list truncated at page limit");
                    }
                    after = Some(cursor);
                }
                _ => break,
            }
        }

        tracing::debug!(count = discounts.len(), "listed app discounts");
        Ok(discounts)
    }

    /// Activates or deactivates a discount node.
    ///
    /// # Errors
    ///
    /// - [`AdminError::UserErrors`] if Shopify rejects the change.
    /// - Anything from [`AdminClient::execute`].
    pub async fn set_discount_active(
        &self,
        discount_id: &str,
        kind: DiscountKind,
        active: bool,
    ) -> Result<(), AdminError> {
        let mutation = activation_mutation(kind, active);
        let query = format!(
            "mutation SetDiscountActive($id: ID!) {{ payload: {mutation}(id: $id) {{ userErrors {{ field message }} }} }}"
        );
        let data: ActivationData = self
            .execute(mutation, &query, json!({ "id": discount_id }))
            .await?;
        let payload = data.payload.ok_or_else(|| AdminError::MissingData {
            operation: mutation.to_owned(),
        })?;
        check_user_errors(mutation, &payload.user_errors)?;
        tracing::info!(discount_id, active, "discount status changed");
        Ok(())
    }
}
