use crate::app_config::{AppConfig, Environment};
use crate::error::ConfigError;
use crate::pipeline::LookupOptions;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function,
/// so tests can drive it from a `HashMap` instead of the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            }),
            Ok(n) => Ok(n),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let shop_domain = normalize_shop_domain(&require("SHOPIFY_SHOP_DOMAIN")?);
    let admin_access_token = require("SHOPIFY_ADMIN_ACCESS_TOKEN")?;
    let api_version = or_default("SHOPIFY_API_VERSION", "2025-10");

    let env_raw = or_default("SKUDISC_ENV", "development");
    let env = parse_environment(&env_raw).ok_or_else(|| ConfigError::InvalidEnvVar {
        var: "SKUDISC_ENV".to_string(),
        reason: format!("unknown environment '{env_raw}'"),
    })?;

    let log_level = or_default("SKUDISC_LOG_LEVEL", "info");
    let metafield_namespace = or_default("SKUDISC_METAFIELD_NAMESPACE", "$app:sku-custom-discount");
    let metafield_key = or_default("SKUDISC_METAFIELD_KEY", "function-configuration");
    let discount_function_id = lookup("SKUDISC_DISCOUNT_FUNCTION_ID")
        .ok()
        .filter(|v| !v.is_empty());

    let request_timeout_secs = parse_u64("SKUDISC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("SKUDISC_USER_AGENT", "skudisc/0.1 (sku-discounts)");
    let lookup_chunk_size = parse_positive("SKUDISC_LOOKUP_CHUNK_SIZE", "10")?;
    let lookup_concurrency = parse_positive("SKUDISC_LOOKUP_CONCURRENCY", "1")?;

    Ok(AppConfig {
        shop_domain,
        admin_access_token,
        api_version,
        env,
        log_level,
        metafield_namespace,
        metafield_key,
        discount_function_id,
        request_timeout_secs,
        user_agent,
        lookup_chunk_size,
        lookup_concurrency,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Option<Environment> {
    match s {
        "development" => Some(Environment::Development),
        "test" => Some(Environment::Test),
        "production" => Some(Environment::Production),
        _ => None,
    }
}

/// Accepts `my-shop.myshopify.com` or a full `https://` URL.
fn normalize_shop_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

impl AppConfig {
    #[must_use]
    pub fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            chunk_size: self.lookup_chunk_size,
            concurrency: self.lookup_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with all required env vars populated with valid defaults.
    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("SHOPIFY_SHOP_DOMAIN", "frames-test.myshopify.com");
        m.insert("SHOPIFY_ADMIN_ACCESS_TOKEN", "shpat_test_token");
        m
    }

    #[test]
    fn parse_environment_known_values() {
        assert_eq!(parse_environment("development"), Some(Environment::Development));
        assert_eq!(parse_environment("test"), Some(Environment::Test));
        assert_eq!(parse_environment("production"), Some(Environment::Production));
    }

    #[test]
    fn parse_environment_unknown_is_none() {
        assert_eq!(parse_environment("staging"), None);
    }

    #[test]
    fn build_app_config_fails_without_shop_domain() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_SHOP_DOMAIN"),
            "expected MissingEnvVar(SHOPIFY_SHOP_DOMAIN), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_fails_without_access_token() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("SHOPIFY_SHOP_DOMAIN", "frames-test.myshopify.com");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_ADMIN_ACCESS_TOKEN"),
            "expected MissingEnvVar(SHOPIFY_ADMIN_ACCESS_TOKEN), got: {result:?}"
        );
    }

    #[test]
    fn blank_required_var_counts_as_missing() {
        let mut map = full_env();
        map.insert("SHOPIFY_ADMIN_ACCESS_TOKEN", "  ");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn build_app_config_succeeds_with_defaults() {
        let map = full_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.shop_domain, "frames-test.myshopify.com");
        assert_eq!(cfg.api_version, "2025-10");
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.metafield_namespace, "$app:sku-custom-discount");
        assert_eq!(cfg.metafield_key, "function-configuration");
        assert!(cfg.discount_function_id.is_none());
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.user_agent, "skudisc/0.1 (sku-discounts)");
        assert_eq!(cfg.lookup_options(), LookupOptions::default());
    }

    #[test]
    fn shop_url_is_reduced_to_domain() {
        let mut map = full_env();
        map.insert("SHOPIFY_SHOP_DOMAIN", "https://frames-test.myshopify.com/");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.shop_domain, "frames-test.myshopify.com");
        assert_eq!(
            cfg.admin_graphql_url(),
            "https://frames-test.myshopify.com/admin/api/2025-10/graphql.json"
        );
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let mut map = full_env();
        map.insert("SKUDISC_ENV", "staging");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUDISC_ENV"),
            "expected InvalidEnvVar(SKUDISC_ENV), got: {result:?}"
        );
    }

    #[test]
    fn request_timeout_invalid() {
        let mut map = full_env();
        map.insert("SKUDISC_REQUEST_TIMEOUT_SECS", "not-a-number");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUDISC_REQUEST_TIMEOUT_SECS"),
            "expected InvalidEnvVar(SKUDISC_REQUEST_TIMEOUT_SECS), got: {result:?}"
        );
    }

    #[test]
    fn lookup_chunk_size_override() {
        let mut map = full_env();
        map.insert("SKUDISC_LOOKUP_CHUNK_SIZE", "25");
        map.insert("SKUDISC_LOOKUP_CONCURRENCY", "3");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.lookup_chunk_size, 25);
        assert_eq!(cfg.lookup_concurrency, 3);
    }

    #[test]
    fn zero_lookup_chunk_size_is_rejected() {
        let mut map = full_env();
        map.insert("SKUDISC_LOOKUP_CHUNK_SIZE", "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUDISC_LOOKUP_CHUNK_SIZE"),
            "expected InvalidEnvVar(SKUDISC_LOOKUP_CHUNK_SIZE), got: {result:?}"
        );
    }

    #[test]
    fn zero_lookup_concurrency_is_rejected() {
        let mut map = full_env();
        map.insert("SKUDISC_LOOKUP_CONCURRENCY", "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    #[test]
    fn function_id_is_read_when_set() {
        let mut map = full_env();
        map.insert("SKUDISC_DISCOUNT_FUNCTION_ID", "gid://shopify/ShopifyFunction/42");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(
            cfg.discount_function_id.as_deref(),
            Some("gid://shopify/ShopifyFunction/42")
        );
    }

    #[test]
    fn debug_redacts_access_token() {
        let map = full_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("shpat_test_token"));
        assert!(debug.contains("[redacted]"));
    }
}
