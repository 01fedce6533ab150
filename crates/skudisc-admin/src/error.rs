use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("GraphQL errors from {operation}: {}", .messages.join("; "))]
    GraphQl {
        operation: String,
        messages: Vec<String>,
    },

    #[error("{operation} rejected: {}", .messages.join("; "))]
    UserErrors {
        operation: String,
        messages: Vec<String>,
    },

    #[error("rate limited by Shopify (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{operation} returned no data")]
    MissingData { operation: String },

    #[error("invalid Admin API URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
