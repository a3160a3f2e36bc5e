//! Health, readiness and metrics endpoint tests.

use anyhow::Result;
use issuer_service::models::ReadinessResponse;
use issuer_test_utils::*;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;

    assert!(server.addr().ip().is_loopback());
    assert_ne!(server.addr().port(), 0);

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_reports_live_keys() -> Result<()> {
    let server = TestIssuerServer::spawn(test_config(2, 3600, 900)).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: ReadinessResponse = response.json().await?;
    assert_eq!(body.status, "ready");
    assert!(body.live_signing_keys >= 2);
    assert_eq!(body.min_live_keys, server.config().min_live_keys);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_text() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;

    // Generate some traffic first
    reqwest::get(format!("{}/health", server.url())).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);
    response.text().await?;

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<()> {
    let server = TestIssuerServer::spawn_default().await?;

    let response = reqwest::get(format!("{}/token", server.url())).await?;
    assert_eq!(response.status(), 404);

    Ok(())
}
