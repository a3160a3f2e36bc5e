//! Local and remote verification must agree on every token.

use anyhow::Result;
use common::error::TokenError;
use common::jwt::extract_kid;
use issuer_service::services::TokenRequest;
use issuer_test_utils::*;
use std::sync::Arc;
use token_verifier::config::Config;
use token_verifier::{JwkClient, RemoteTokenVerifier};

fn remote_verifier(server: &TestIssuerServer) -> Result<RemoteTokenVerifier> {
    Ok(RemoteTokenVerifier::from_config(&Config::new(
        server.jwk_endpoint(),
    ))?)
}

fn random_request(i: usize) -> TokenRequest {
    let groups = (0..i % 4).map(|g| format!("group-{g}")).collect();
    TokenRequest::new(
        format!("tenant-{}", i % 7),
        format!("user-{}@{}", uuid::Uuid::new_v4(), i),
        if i % 2 == 0 { "read,write" } else { "read write admin" },
        groups,
    )
}

#[tokio::test]
async fn test_remote_and_local_agree_on_100_tokens() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(3, 3600, 900)).await?;
    let remote = remote_verifier(&server)?;

    for i in 0..100 {
        let request = random_request(i);
        let token = server.token_service().issue(&request).await?;

        let local = server.verifier().verify(&token).await?;
        let fetched = remote.verify(&token).await?;

        let claims = local.ok_or_else(|| anyhow::anyhow!("local rejected token {i}"))?;
        assert_eq!(Some(&claims), fetched.as_ref(), "token {i}");
        assert_eq!(claims.tenant_id, request.tenant_id);
        assert_eq!(claims.sub, request.subject);
        assert_eq!(claims.scope, request.scope);
        assert_eq!(claims.groups, request.groups);
    }

    Ok(())
}

#[tokio::test]
async fn test_published_key_matches_cached_key() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(4, 3600, 900)).await?;
    let client = JwkClient::new(&Config::new(server.jwk_endpoint()))?;

    let jwks = server.token_service().publish_all_at(chrono::Utc::now().timestamp()).await;
    assert_eq!(jwks.keys.len(), 4);

    for record in &jwks.keys {
        let fetched = client
            .get_key(&record.kid, chrono::Utc::now().timestamp())
            .await?
            .ok_or_else(|| anyhow::anyhow!("key {} not published", record.kid))?;
        let cached = server
            .cache()
            .lookup(&record.kid)
            .await
            .ok_or_else(|| anyhow::anyhow!("key {} not cached", record.kid))?;

        assert_eq!(fetched, *cached.public_key());
    }

    Ok(())
}

#[tokio::test]
async fn test_remote_rejects_tampered_tokens() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let remote = remote_verifier(&server)?;

    let token = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[GROUP_USER])
        .await?;
    assert!(remote.verify(&token).await?.is_some());

    assert_eq!(remote.verify(&tamper_signature(&token)).await?, None);

    let mut payload = decode_payload(&token);
    payload["groups"] = serde_json::json!([GROUP_ADMIN]);
    assert_eq!(remote.verify(&replace_payload(&token, &payload)).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_remote_rejects_foreign_issuer() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let other = TestIssuerServer::spawn_default().await?;
    let remote = remote_verifier(&server)?;

    let token = other
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[])
        .await?;

    assert_eq!(remote.verify(&token).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_remote_bit_flips_are_empty_or_malformed() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let remote = remote_verifier(&server)?;

    let token = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[])
        .await?;
    let kid = extract_kid(&token)?;
    let signature_start = token.rfind('.').map_or(0, |i| i + 1);

    // Signature and payload flips keep the kid, so every probe hits the cache
    for index in (signature_start.saturating_sub(40)..token.len()).step_by(3) {
        let mut bytes = token.clone().into_bytes();
        if let Some(byte) = bytes.get_mut(index) {
            *byte ^= 0x01;
        }
        let Ok(candidate) = String::from_utf8(bytes) else {
            continue;
        };

        let result = remote.verify(&candidate).await;
        assert!(
            matches!(result, Ok(None) | Err(TokenError::MalformedToken(_))),
            "byte {index}: {result:?}"
        );
    }

    assert_eq!(remote.client().cached_keys().await, 1);
    assert!(server.cache().lookup(&kid).await.is_some());

    Ok(())
}

#[tokio::test]
async fn test_issuer_down_is_fetch_failure() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let endpoint = server.jwk_endpoint();
    let token = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[])
        .await?;
    drop(server);

    let mut config = Config::new(endpoint);
    config.fetch_timeout_seconds = 1;
    let remote = RemoteTokenVerifier::new(Arc::new(JwkClient::new(&config)?));

    let result = remote.verify(&token).await;
    assert!(matches!(result, Err(TokenError::KeyFetchFailed(_))));

    Ok(())
}
