//! Response models for the token issuer HTTP surface.
//!
//! Key records themselves (`JwkRecord`, `JwkSet`) live in `common::jwk`
//! because remote verifiers deserialize the same shapes.

use serde::{Deserialize, Serialize};

/// Query string of `GET /jwk`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkQuery {
    pub kid: Option<String>,
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// Key pairs currently able to sign.
    pub live_signing_keys: usize,

    /// Configured minimum.
    pub min_live_keys: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_query_missing_kid() {
        let query: JwkQuery = serde_json::from_str("{}").unwrap();
        assert!(query.kid.is_none());
    }

    #[test]
    fn test_readiness_response_shape() {
        let response = ReadinessResponse {
            status: "ready".to_string(),
            live_signing_keys: 2,
            min_live_keys: 2,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ready", "live_signing_keys": 2, "min_live_keys": 2})
        );
    }
}
