use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `my-shop.myshopify.com`, without scheme.
    pub shop_domain: String,
    pub admin_access_token: String,
    pub api_version: String,
    pub env: Environment,
    pub log_level: String,
    pub metafield_namespace: String,
    pub metafield_key: String,
    /// GID of the deployed discount function; listing is unfiltered when unset.
    pub discount_function_id: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub lookup_chunk_size: usize,
    pub lookup_concurrency: usize,
}

impl AppConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `https://{shop}/admin/api/{version}/graphql.json`
    #[must_use]
    pub fn admin_graphql_url(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop_domain, self.api_version
        )
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("shop_domain", &self.shop_domain)
            .field("admin_access_token", &"[redacted]")
            .field("api_version", &self.api_version)
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("metafield_namespace", &self.metafield_namespace)
            .field("metafield_key", &self.metafield_key)
            .field("discount_function_id", &self.discount_function_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("lookup_chunk_size", &self.lookup_chunk_size)
            .field("lookup_concurrency", &self.lookup_concurrency)
            .finish()
    }
}
