//! Token issuer configuration.
//!
//! Loaded from environment variables. Lifetimes are validated up front so the
//! key cache never has to deal with a zero-length window.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8082";

/// Default key pair signing lifetime in seconds (1 hour).
pub const DEFAULT_KEY_PAIR_LIFETIME_SECONDS: i64 = 3600;

/// Default token lifetime in seconds (15 minutes).
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 900;

/// Default number of privately live key pairs kept in the cache.
pub const DEFAULT_MIN_LIVE_KEYS: usize = 2;

/// Upper bound for `MIN_LIVE_KEYS`.
pub const MAX_MIN_LIVE_KEYS: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,

    /// How long a key pair may sign, in seconds.
    pub key_pair_lifetime_seconds: i64,

    /// How long an issued token stays valid, in seconds. Also the extra time
    /// a key pair stays verifiable after it stops signing.
    pub token_lifetime_seconds: i64,

    pub min_live_keys: usize,

    /// `iss` claim written into every token.
    pub issuer: String,

    /// `aud` claim written into every token.
    pub audiences: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid key pair lifetime: {0}")]
    InvalidKeyPairLifetime(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidTokenLifetime(String),

    #[error("Invalid minimum live keys: {0}")]
    InvalidMinLiveKeys(String),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Invalid audiences: {0}")]
    InvalidAudiences(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let key_pair_lifetime_seconds = parse_positive_seconds(
            vars,
            "KEY_PAIR_LIFETIME_SECONDS",
            DEFAULT_KEY_PAIR_LIFETIME_SECONDS,
        )
        .map_err(ConfigError::InvalidKeyPairLifetime)?;

        let token_lifetime_seconds = parse_positive_seconds(
            vars,
            "TOKEN_LIFETIME_SECONDS",
            DEFAULT_TOKEN_LIFETIME_SECONDS,
        )
        .map_err(ConfigError::InvalidTokenLifetime)?;

        let min_live_keys = if let Some(value_str) = vars.get("MIN_LIVE_KEYS") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidMinLiveKeys(format!(
                    "MIN_LIVE_KEYS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if !(1..=MAX_MIN_LIVE_KEYS).contains(&value) {
                return Err(ConfigError::InvalidMinLiveKeys(format!(
                    "MIN_LIVE_KEYS must be between 1 and {MAX_MIN_LIVE_KEYS}, got {value}"
                )));
            }

            value
        } else {
            DEFAULT_MIN_LIVE_KEYS
        };

        let issuer = vars
            .get("JWT_ISSUER")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_ISSUER".to_string()))?
            .trim()
            .to_string();

        if issuer.is_empty() {
            return Err(ConfigError::InvalidIssuer(
                "JWT_ISSUER must not be empty".to_string(),
            ));
        }

        let audiences: Vec<String> = vars
            .get("JWT_AUDIENCES")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_AUDIENCES".to_string()))?
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToString::to_string)
            .collect();

        if audiences.is_empty() {
            return Err(ConfigError::InvalidAudiences(
                "JWT_AUDIENCES must contain at least one audience".to_string(),
            ));
        }

        Ok(Config {
            bind_address,
            key_pair_lifetime_seconds,
            token_lifetime_seconds,
            min_live_keys,
            issuer,
            audiences,
        })
    }
}

fn parse_positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: i64,
) -> Result<i64, String> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: i64 = value_str
        .parse()
        .map_err(|e| format!("{name} must be a valid integer, got '{value_str}': {e}"))?;

    if value <= 0 {
        return Err(format!("{name} must be positive, got {value}"));
    }

    Ok(value)
}
