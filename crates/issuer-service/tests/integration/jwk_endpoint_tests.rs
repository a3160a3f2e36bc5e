//! Key publication endpoint tests.
//!
//! Exercise `GET /jwk` and `GET /.well-known/jwks.json` over real HTTP.

use anyhow::Result;
use common::jwk::{JwkRecord, JwkSet};
use common::jwt::extract_kid;
use issuer_test_utils::*;

#[tokio::test]
async fn test_jwk_for_signing_key() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let token = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[])
        .await?;
    let kid = extract_kid(&token)?;

    let response = reqwest::Client::new()
        .get(server.jwk_endpoint())
        .query(&[("kid", kid.as_str())])
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    let fields: Vec<&str> = body
        .as_object()
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default();
    assert_eq!(fields.len(), 4, "JWK must carry exactly kty, crv, kid, x");

    let record: JwkRecord = serde_json::from_value(body)?;
    assert_eq!(record.kty, "OKP");
    assert_eq!(record.crv, "Ed25519");
    assert_eq!(record.kid, kid);
    assert_eq!(record.x.len(), 43, "32 bytes base64url without padding");

    let pair = server
        .cache()
        .lookup(&kid)
        .await
        .ok_or_else(|| anyhow::anyhow!("signing key missing from cache"))?;
    assert_eq!(record.to_public_key()?, *pair.public_key());

    Ok(())
}

#[tokio::test]
async fn test_jwk_unknown_kid_returns_404() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;

    let response = reqwest::Client::new()
        .get(server.jwk_endpoint())
        .query(&[("kid", TEST_KEY_ID_UNKNOWN)])
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "KEY_NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn test_jwk_missing_kid_returns_400() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let client = reqwest::Client::new();

    let response = client.get(server.jwk_endpoint()).send().await?;
    assert_eq!(response.status(), 400);

    let response = client
        .get(format!("{}?kid=", server.jwk_endpoint()))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    Ok(())
}

#[tokio::test]
async fn test_jwk_kid_is_query_encoded() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;

    // Must reach the handler as a literal kid, not as extra query params
    let response = reqwest::Client::new()
        .get(server.jwk_endpoint())
        .query(&[("kid", "a&kid=b c")])
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_jwks_lists_every_verifiable_key() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(3, 3600, 900)).await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("max-age=60")
    );

    let jwks: JwkSet = response.json().await?;
    assert_eq!(jwks.keys.len(), 3);
    for record in &jwks.keys {
        assert!(server.cache().lookup(&record.kid).await.is_some());
        record.to_public_key()?;
    }

    Ok(())
}
