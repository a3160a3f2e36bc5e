//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over encoded tokens. None of them verify
//! the signature; pair them with a verifier for that.

use common::jwt::TokenParts;
use serde_json::Value;

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_signed_by(&kid)
///     .assert_for_subject("alice")
///     .assert_has_scope("read");
/// ```
pub trait TokenAssertions {
    /// Assert the token has the wire shape the issuer produces
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the header names the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that `sub` and `upn` both equal `subject`
    fn assert_for_subject(&self, subject: &str) -> &Self;

    fn assert_in_tenant(&self, tenant_id: &str) -> &Self;

    /// Assert that the scope string contains `scope`
    fn assert_has_scope(&self, scope: &str) -> &Self;

    fn assert_in_group(&self, group: &str) -> &Self;

    /// Assert `exp - iat` equals the token lifetime
    fn assert_lifetime(&self, seconds: i64) -> &Self;
}

fn header(token: &str) -> Value {
    let parts = TokenParts::split(token).expect("Token must have 3 segments");
    parts.header_json().expect("Failed to decode token header")
}

fn payload(token: &str) -> Value {
    let parts = TokenParts::split(token).expect("Token must have 3 segments");
    parts.payload_json().expect("Failed to decode token payload")
}

impl TokenAssertions for str {
    fn assert_valid_jwt(&self) -> &Self {
        let segments = self.split('.').count();
        assert_eq!(
            segments, 3,
            "JWT must have 3 parts (header.payload.signature), got {segments}"
        );
        assert!(!self.contains('='), "Token segments must not be padded");

        let header = header(self);
        assert_eq!(header["typ"], "JWT", "Expected JWT type");
        assert_eq!(header["alg"], "EdDSA", "Expected EdDSA algorithm");
        assert!(
            header["kid"].as_str().is_some_and(|kid| !kid.is_empty()),
            "Header must carry a kid"
        );

        let payload = payload(self);
        for claim in [
            "iss",
            "aud",
            "tenant-id",
            "sub",
            "upn",
            "scope",
            "groups",
            "exp",
            "iat",
            "nbf",
            "jti",
        ] {
            assert!(payload.get(claim).is_some(), "Missing claim '{claim}'");
        }

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header["kid"].as_str(),
            Some(key_id),
            "Expected key_id '{key_id}', got {:?}",
            header["kid"]
        );
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let payload = payload(self);
        assert_eq!(payload["sub"], subject, "Unexpected subject");
        assert_eq!(payload["upn"], subject, "upn must equal sub");
        self
    }

    fn assert_in_tenant(&self, tenant_id: &str) -> &Self {
        assert_eq!(payload(self)["tenant-id"], tenant_id, "Unexpected tenant");
        self
    }

    fn assert_has_scope(&self, scope: &str) -> &Self {
        let payload = payload(self);
        let scope_string = payload["scope"].as_str().unwrap_or_default();
        assert!(
            scope_string
                .split(|c: char| c == ',' || c.is_whitespace())
                .any(|s| s == scope),
            "Token does not contain scope '{scope}'. Available scopes: {scope_string}"
        );
        self
    }

    fn assert_in_group(&self, group: &str) -> &Self {
        let payload = payload(self);
        let groups = payload["groups"].as_array().cloned().unwrap_or_default();
        assert!(
            groups.iter().any(|g| g == group),
            "Token is not in group '{group}'. Groups: {groups:?}"
        );
        self
    }

    fn assert_lifetime(&self, seconds: i64) -> &Self {
        let payload = payload(self);
        let exp = payload["exp"].as_i64().expect("exp must be an integer");
        let iat = payload["iat"].as_i64().expect("iat must be an integer");
        assert_eq!(exp - iat, seconds, "Unexpected token lifetime");
        self
    }
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        self.as_str().assert_valid_jwt();
        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        self.as_str().assert_signed_by(key_id);
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        self.as_str().assert_for_subject(subject);
        self
    }

    fn assert_in_tenant(&self, tenant_id: &str) -> &Self {
        self.as_str().assert_in_tenant(tenant_id);
        self
    }

    fn assert_has_scope(&self, scope: &str) -> &Self {
        self.as_str().assert_has_scope(scope);
        self
    }

    fn assert_in_group(&self, group: &str) -> &Self {
        self.as_str().assert_in_group(group);
        self
    }

    fn assert_lifetime(&self, seconds: i64) -> &Self {
        self.as_str().assert_lifetime(seconds);
        self
    }
}
