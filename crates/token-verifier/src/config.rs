//! Remote verifier configuration.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default timeout for a single key fetch in seconds.
pub const DEFAULT_JWK_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for `JWK_FETCH_TIMEOUT_SECONDS`.
pub const MAX_JWK_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Default lifetime of a cached public key in seconds (5 minutes).
pub const DEFAULT_JWK_CACHE_TTL_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    /// Key publication endpoint, queried as `<jwk_endpoint>?kid=<id>`.
    pub jwk_endpoint: String,

    pub fetch_timeout_seconds: u64,

    /// How long a fetched key is reused. 0 disables caching.
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWK endpoint: {0}")]
    InvalidJwkEndpoint(String),

    #[error("Invalid fetch timeout: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid cache TTL: {0}")]
    InvalidCacheTtl(String),
}

impl Config {
    /// Config pointing at `jwk_endpoint` with default timeout and TTL.
    pub fn new(jwk_endpoint: impl Into<String>) -> Self {
        Self {
            jwk_endpoint: jwk_endpoint.into(),
            fetch_timeout_seconds: DEFAULT_JWK_FETCH_TIMEOUT_SECONDS,
            cache_ttl_seconds: DEFAULT_JWK_CACHE_TTL_SECONDS,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwk_endpoint = vars
            .get("JWK_ENDPOINT")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWK_ENDPOINT".to_string()))?
            .trim()
            .to_string();

        if !(jwk_endpoint.starts_with("http://") || jwk_endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidJwkEndpoint(format!(
                "JWK_ENDPOINT must be an http(s) URL, got '{jwk_endpoint}'"
            )));
        }

        let fetch_timeout_seconds = if let Some(value_str) = vars.get("JWK_FETCH_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JWK_FETCH_TIMEOUT_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if !(1..=MAX_JWK_FETCH_TIMEOUT_SECONDS).contains(&value) {
                return Err(ConfigError::InvalidFetchTimeout(format!(
                    "JWK_FETCH_TIMEOUT_SECONDS must be between 1 and {MAX_JWK_FETCH_TIMEOUT_SECONDS}, got {value}"
                )));
            }

            value
        } else {
            DEFAULT_JWK_FETCH_TIMEOUT_SECONDS
        };

        let cache_ttl_seconds = match vars.get("JWK_CACHE_TTL_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWK_CACHE_TTL_SECONDS must be a non-negative integer, got '{value_str}': {e}"
                ))
            })?,
            None => DEFAULT_JWK_CACHE_TTL_SECONDS,
        };

        Ok(Config {
            jwk_endpoint,
            fetch_timeout_seconds,
            cache_ttl_seconds,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&vars(&[("JWK_ENDPOINT", "http://issuer:8082/jwk")]))
            .expect("Config should load successfully");

        assert_eq!(config.jwk_endpoint, "http://issuer:8082/jwk");
        assert_eq!(config.fetch_timeout_seconds, 5);
        assert_eq!(config.cache_ttl_seconds, 300);
    }

    #[test]
    fn test_from_vars_custom_values() {
        let config = Config::from_vars(&vars(&[
            ("JWK_ENDPOINT", "https://issuer.example.com/jwk"),
            ("JWK_FETCH_TIMEOUT_SECONDS", "2"),
            ("JWK_CACHE_TTL_SECONDS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.fetch_timeout_seconds, 2);
        assert_eq!(config.cache_ttl_seconds, 0);
    }

    #[test]
    fn test_missing_endpoint() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWK_ENDPOINT"));
    }

    #[test]
    fn test_endpoint_must_be_http() {
        for endpoint in ["", "issuer:8082/jwk", "ftp://issuer/jwk"] {
            let result = Config::from_vars(&vars(&[("JWK_ENDPOINT", endpoint)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidJwkEndpoint(_))),
                "endpoint '{endpoint}' should be rejected"
            );
        }
    }

    #[test]
    fn test_fetch_timeout_bounds() {
        for value in ["0", "61", "-1", "abc"] {
            let result = Config::from_vars(&vars(&[
                ("JWK_ENDPOINT", "http://issuer/jwk"),
                ("JWK_FETCH_TIMEOUT_SECONDS", value),
            ]));
            assert!(
                matches!(result, Err(ConfigError::InvalidFetchTimeout(_))),
                "timeout '{value}' should be rejected"
            );
        }

        let config = Config::from_vars(&vars(&[
            ("JWK_ENDPOINT", "http://issuer/jwk"),
            ("JWK_FETCH_TIMEOUT_SECONDS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.fetch_timeout_seconds, 60);
    }

    #[test]
    fn test_invalid_cache_ttl() {
        let result = Config::from_vars(&vars(&[
            ("JWK_ENDPOINT", "http://issuer/jwk"),
            ("JWK_CACHE_TTL_SECONDS", "-5"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidCacheTtl(_))));
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("http://issuer/jwk");
        assert_eq!(config.fetch_timeout_seconds, DEFAULT_JWK_FETCH_TIMEOUT_SECONDS);
        assert_eq!(config.cache_ttl_seconds, DEFAULT_JWK_CACHE_TTL_SECONDS);
    }
}
