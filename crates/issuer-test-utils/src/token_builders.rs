//! Builder patterns for test token construction
//!
//! The builder signs with any [`SigningKey`], so tests can craft tokens the
//! issuer would never mint: missing claims, past expiry, foreign keys, odd
//! headers. The free functions tamper with already-signed tokens.

use crate::test_ids::{TEST_AUDIENCE, TEST_ISSUER, TEST_SUBJECT_ALICE, TEST_TENANT_ACME};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use common::jwt::{encode_segment, signing_input};
use issuer_service::crypto::SigningKey;
use serde_json::{json, Map, Value};

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("alice")
///     .with_scope("read write")
///     .expires_in(60)
///     .sign("kid-1", &key)?;
/// ```
pub struct TestTokenBuilder {
    header: Map<String, Value>,
    payload: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with issuer-shaped defaults, valid for
    /// one hour from now.
    pub fn new() -> Self {
        let now = Utc::now().timestamp();

        let header = json!({ "typ": "JWT", "alg": "EdDSA" });
        let payload = json!({
            "iss": TEST_ISSUER,
            "aud": [TEST_AUDIENCE],
            "tenant-id": TEST_TENANT_ACME,
            "sub": TEST_SUBJECT_ALICE,
            "upn": TEST_SUBJECT_ALICE,
            "scope": "",
            "groups": [],
            "exp": now + 3600,
            "iat": now,
            "nbf": now,
            "jti": uuid::Uuid::new_v4().to_string(),
        });

        Self {
            header: into_object(header),
            payload: into_object(payload),
        }
    }

    /// Set `sub` and `upn`
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.payload.insert("sub".to_string(), json!(subject));
        self.payload.insert("upn".to_string(), json!(subject));
        self
    }

    pub fn in_tenant(mut self, tenant_id: &str) -> Self {
        self.payload.insert("tenant-id".to_string(), json!(tenant_id));
        self
    }

    /// Set the scope string verbatim
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.payload.insert("scope".to_string(), json!(scope));
        self
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.payload.insert("groups".to_string(), json!(groups));
        self
    }

    /// Set `iat` and `nbf`
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.payload.insert("iat".to_string(), json!(timestamp));
        self.payload.insert("nbf".to_string(), json!(timestamp));
        self
    }

    /// Set `exp` as an absolute timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.payload.insert("exp".to_string(), json!(timestamp));
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = Utc::now().timestamp() + seconds;
        self.expires_at(exp)
    }

    /// Set or replace any payload claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.payload.insert(name.to_string(), value);
        self
    }

    /// Drop a payload claim entirely
    pub fn without_claim(mut self, name: &str) -> Self {
        self.payload.remove(name);
        self
    }

    /// Set or replace any header field
    pub fn with_header(mut self, name: &str, value: Value) -> Self {
        self.header.insert(name.to_string(), value);
        self
    }

    /// Payload as a JSON value
    pub fn payload(&self) -> Value {
        Value::Object(self.payload.clone())
    }

    /// Sign with `key`, naming it `kid` in the header.
    ///
    /// A `kid` set through [`TestTokenBuilder::with_header`] is overwritten.
    pub fn sign(mut self, kid: &str, key: &SigningKey) -> Result<String, anyhow::Error> {
        self.header.insert("kid".to_string(), json!(kid));
        self.sign_raw(key)
    }

    /// Sign with `key` using the header exactly as built, `kid` or not.
    pub fn sign_raw(self, key: &SigningKey) -> Result<String, anyhow::Error> {
        let header_b64 = encode_segment(&Value::Object(self.header))?;
        let payload_b64 = encode_segment(&Value::Object(self.payload))?;

        let input = signing_input(&header_b64, &payload_b64);
        let signature = key
            .sign(input.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to sign test token: {e}"))?;

        Ok(format!("{input}.{signature}"))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Flip one bit of the decoded signature, keeping the encoding valid.
pub fn tamper_signature(token: &str) -> String {
    let (input, signature) = token.rsplit_once('.').expect("token has no signature");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature is not base64url");
    bytes[0] ^= 0x01;

    format!("{input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Replace the payload segment, leaving the original signature in place.
pub fn replace_payload(token: &str, payload: &Value) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token must have 3 segments");

    let payload_b64 = encode_segment(payload).expect("payload must serialize");
    format!("{}.{}.{}", parts[0], payload_b64, parts[2])
}

/// Decode the payload segment of a token without verifying it.
pub fn decode_payload(token: &str) -> Value {
    let payload = token.split('.').nth(1).expect("token has no payload");
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("payload is not base64url");
    serde_json::from_slice(&bytes).expect("payload is not JSON")
}
