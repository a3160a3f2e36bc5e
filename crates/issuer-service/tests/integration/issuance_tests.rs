//! Issue and verify locally against the server's own cache.

use anyhow::Result;
use common::error::TokenError;
use issuer_test_utils::*;

#[tokio::test]
async fn test_issued_token_shape() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(2, 3600, 600)).await?;

    let token = server
        .issue_token(
            TEST_TENANT_ACME,
            TEST_SUBJECT_ALICE,
            "read,write",
            &[GROUP_ADMIN, GROUP_USER],
        )
        .await?;

    let signer = server.cache().pick_signable().await?;
    token
        .assert_valid_jwt()
        .assert_signed_by(signer.id())
        .assert_for_subject(TEST_SUBJECT_ALICE)
        .assert_in_tenant(TEST_TENANT_ACME)
        .assert_has_scope(SCOPE_READ)
        .assert_has_scope(SCOPE_WRITE)
        .assert_in_group(GROUP_ADMIN)
        .assert_lifetime(600);

    let payload = decode_payload(&token);
    assert_eq!(payload["iss"], TEST_ISSUER);
    assert_eq!(payload["aud"], serde_json::json!([TEST_AUDIENCE]));
    assert_eq!(payload["iat"], payload["nbf"]);

    Ok(())
}

#[tokio::test]
async fn test_local_round_trip() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let token = server
        .issue_token(TEST_TENANT_GLOBEX, TEST_SUBJECT_BOB, "read write", &[GROUP_USER])
        .await?;

    let claims = server
        .verifier()
        .verify(&token)
        .await?
        .ok_or_else(|| anyhow::anyhow!("freshly issued token rejected"))?;

    assert_eq!(claims.tenant_id, TEST_TENANT_GLOBEX);
    assert_eq!(claims.sub, TEST_SUBJECT_BOB);
    assert_eq!(claims.upn, TEST_SUBJECT_BOB);
    assert_eq!(claims.scope, "read write");
    assert!(claims.in_group(GROUP_USER));

    Ok(())
}

#[tokio::test]
async fn test_crafted_tokens_are_rejected() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let verifier = server.verifier();

    // Signed by a key the cache never held
    let foreign = TestTokenBuilder::new().sign(TEST_KEY_ID_1, &test_signing_key(1)?)?;
    assert_eq!(verifier.verify(&foreign).await?, None);

    // Signed by a cached key but already expired
    server
        .cache()
        .insert(test_key_pair(2, TEST_KEY_ID_2, chrono::Utc::now().timestamp(), 3600, 900)?)
        .await;
    let expired = TestTokenBuilder::new()
        .expires_in(-10)
        .sign(TEST_KEY_ID_2, &test_signing_key(2)?)?;
    assert_eq!(verifier.verify(&expired).await?, None);

    // Same key, still valid, but the signature was tampered with
    let valid = TestTokenBuilder::new().sign(TEST_KEY_ID_2, &test_signing_key(2)?)?;
    assert!(verifier.verify(&valid).await?.is_some());
    assert_eq!(verifier.verify(&tamper_signature(&valid)).await?, None);

    // Payload swapped under the original signature
    let forged = replace_payload(&valid, &TestTokenBuilder::new().for_subject("mallory").payload());
    assert_eq!(verifier.verify(&forged).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_structurally_broken_tokens_are_malformed() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let key = test_signing_key(3)?;
    server
        .cache()
        .insert(test_key_pair(3, TEST_KEY_ID_1, chrono::Utc::now().timestamp(), 3600, 900)?)
        .await;

    let no_kid = TestTokenBuilder::new().sign_raw(&key)?;
    let no_exp = TestTokenBuilder::new()
        .without_claim("exp")
        .sign(TEST_KEY_ID_1, &key)?;
    let no_groups = TestTokenBuilder::new()
        .without_claim("groups")
        .sign(TEST_KEY_ID_1, &key)?;
    let oversized = "a".repeat(9000);

    for token in [
        "only.two",
        "four.parts.are.bad",
        oversized.as_str(),
        no_kid.as_str(),
        no_exp.as_str(),
        no_groups.as_str(),
    ] {
        let result = server.verifier().verify(token).await;
        assert!(
            matches!(result, Err(TokenError::MalformedToken(_))),
            "expected MalformedToken, got {result:?}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_fixed_clock_and_extra_fields() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;
    let key = test_signing_key(4)?;
    server
        .cache()
        .insert(test_key_pair(4, TEST_KEY_ID_1, TEST_EPOCH, 3600, 900)?)
        .await;
    let verifier = server.verifier();

    // Unknown header fields and extra claims do not affect verification
    let token = TestTokenBuilder::new()
        .issued_at(TEST_EPOCH)
        .expires_at(TEST_EPOCH + 900)
        .with_header("cty", serde_json::json!("JWT"))
        .with_claim("jti", serde_json::json!("fixed-jti"))
        .with_claim("department", serde_json::json!("research"))
        .sign(TEST_KEY_ID_1, &key)?;

    assert!(verifier.verify_at(&token, TEST_EPOCH).await?.is_some());
    assert!(verifier.verify_at(&token, TEST_EPOCH + 900).await?.is_some());
    assert_eq!(verifier.verify_at(&token, TEST_EPOCH + 901).await?, None);

    // A non-numeric exp is structural, not a rejection
    let bad_exp = TestTokenBuilder::new()
        .with_claim("exp", serde_json::json!("never"))
        .sign(TEST_KEY_ID_1, &key)?;
    let result = verifier.verify_at(&bad_exp, TEST_EPOCH).await;
    assert!(
        matches!(result, Err(TokenError::MalformedToken(_))),
        "{result:?}"
    );

    Ok(())
}
