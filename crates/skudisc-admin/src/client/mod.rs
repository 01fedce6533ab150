//! HTTP client for the Shopify Admin GraphQL API.

mod catalog;
mod discounts;
mod metafield;

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use skudisc_core::AppConfig;

use crate::error::AdminError;
use crate::types::GraphQlResponse;

pub use catalog::sku_search_query;
pub use metafield::DiscountMetafield;

/// Seconds to report when Shopify throttles without a usable `Retry-After`.
const THROTTLE_RETRY_SECS: u64 = 2;

/// Client for one shop's Admin GraphQL endpoint.
///
/// Every call is a single POST; failures are returned as typed errors and
/// nothing is retried automatically. Use [`AdminClient::new`] for a live
/// shop or [`AdminClient::with_base_url`] to point at a mock server in tests.
pub struct AdminClient {
    client: Client,
    endpoint: Url,
    access_token: String,
}

impl AdminClient {
    /// Creates a client for the shop and API version in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AdminError::InvalidUrl`] if the shop
    /// domain does not form a valid URL.
    pub fn new(config: &AppConfig) -> Result<Self, AdminError> {
        Self::with_base_url(
            &config.admin_access_token,
            config.request_timeout_secs,
            &config.user_agent,
            &format!("https://{}", config.shop_domain),
            &config.api_version,
        )
    }

    /// Creates a client against a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// See [`AdminClient::new`].
    pub fn with_base_url(
        access_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
        api_version: &str,
    ) -> Result<Self, AdminError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let raw = format!(
            "{}/admin/api/{api_version}/graphql.json",
            base_url.trim_end_matches('/')
        );
        let endpoint = Url::parse(&raw).map_err(|e| AdminError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            endpoint,
            access_token: access_token.to_owned(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Runs one GraphQL operation and returns its `data`.
    ///
    /// # Errors
    ///
    /// - [`AdminError::RateLimited`] on HTTP 429 or a `THROTTLED` GraphQL error.
    /// - [`AdminError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`AdminError::Http`] on network or TLS failure.
    /// - [`AdminError::Deserialize`] if the body does not match `T`.
    /// - [`AdminError::GraphQl`] if the response carries top-level errors.
    /// - [`AdminError::MissingData`] if `data` is absent.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AdminError> {
        tracing::debug!(operation, "admin graphql request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(THROTTLE_RETRY_SECS);
            return Err(AdminError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(AdminError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: GraphQlResponse<T> =
            serde_json::from_str(&body).map_err(|e| AdminError::Deserialize {
                context: operation.to_owned(),
                source: e,
            })?;

        if !parsed.errors.is_empty() {
            if parsed.errors.iter().any(crate::types::GraphQlError::is_throttled) {
                return Err(AdminError::RateLimited {
                    retry_after_secs: THROTTLE_RETRY_SECS,
                });
            }
            return Err(AdminError::GraphQl {
                operation: operation.to_owned(),
                messages: parsed.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        parsed.data.ok_or_else(|| AdminError::MissingData {
            operation: operation.to_owned(),
        })
    }
}

/// Turns a mutation's non-empty `userErrors` into [`AdminError::UserErrors`].
fn check_user_errors(
    operation: &str,
    user_errors: &[crate::types::UserError],
) -> Result<(), AdminError> {
    if user_errors.is_empty() {
        return Ok(());
    }
    Err(AdminError::UserErrors {
        operation: operation.to_owned(),
        messages: user_errors.iter().map(crate::types::UserError::describe).collect(),
    })
}
