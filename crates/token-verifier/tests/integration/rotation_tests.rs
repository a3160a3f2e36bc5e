//! Key rotation as seen by a remote verifier.

use anyhow::Result;
use common::jwt::extract_kid;
use issuer_test_utils::*;
use token_verifier::config::Config;
use token_verifier::RemoteTokenVerifier;

#[tokio::test]
async fn test_rotation_scenario_over_http() -> Result<()> {
    // key lifetime 5s, token lifetime 2s, one live key
    let server = TestIssuerServer::spawn(test_config(1, 5, 2)).await?;
    let token_service = server.token_service();

    let t0 = chrono::Utc::now().timestamp();
    let request =
        issuer_service::services::TokenRequest::new(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, vec![]);
    let token = token_service.issue_at(&request, t0).await?;
    let kid = extract_kid(&token)?;

    let mut config = Config::new(server.jwk_endpoint());
    config.cache_ttl_seconds = 0;
    let remote = RemoteTokenVerifier::from_config(&config)?;

    assert!(remote.verify_at(&token, t0 + 1).await?.is_some());
    assert!(server.verifier().verify_at(&token, t0 + 1).await?.is_some());

    // The token itself is past exp at t0 + 8, whatever the key state
    assert_eq!(remote.verify_at(&token, t0 + 8).await?, None);
    assert_eq!(server.verifier().verify_at(&token, t0 + 8).await?, None);
    assert!(server.cache().lookup_at(&kid, t0 + 8).await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_new_key_is_fetched_after_rotation() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(1, 3600, 900)).await?;
    let remote = RemoteTokenVerifier::from_config(&Config::new(server.jwk_endpoint()))?;

    let first = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_ALICE, SCOPE_READ, &[])
        .await?;
    assert!(remote.verify(&first).await?.is_some());

    // A fresh pair with a later private expiry takes over signing
    let now = chrono::Utc::now().timestamp();
    server
        .cache()
        .insert(test_key_pair(5, TEST_KEY_ID_1, now + 10, 3600, 900)?)
        .await;

    let second = server
        .issue_token(TEST_TENANT_ACME, TEST_SUBJECT_BOB, SCOPE_WRITE, &[])
        .await?;
    second.assert_signed_by(TEST_KEY_ID_1);

    assert!(remote.verify(&second).await?.is_some());
    assert!(remote.verify(&first).await?.is_some());
    assert_eq!(remote.client().cached_keys().await, 2);

    Ok(())
}
