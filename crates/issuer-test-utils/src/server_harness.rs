//! Test server harness for E2E testing
//!
//! Provides TestIssuerServer for spawning a real token issuer in tests. The
//! harness keeps a handle on the server's state, so tests can mint tokens
//! and inspect the key cache without going over HTTP.

use crate::test_ids::{TEST_AUDIENCE, TEST_ISSUER};
use issuer_service::config::Config;
use issuer_service::observability::metrics::init_metrics_recorder;
use issuer_service::routes::{self, AppState};
use issuer_service::services::{KeyCache, LocalTokenVerifier, TokenRequest, TokenService};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Issuer configuration for tests, bound to an ephemeral local port.
pub fn test_config(
    min_live_keys: usize,
    key_pair_lifetime_seconds: i64,
    token_lifetime_seconds: i64,
) -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        key_pair_lifetime_seconds,
        token_lifetime_seconds,
        min_live_keys,
        issuer: TEST_ISSUER.to_string(),
        audiences: vec![TEST_AUDIENCE.to_string()],
    }
}

/// Test harness for spawning the token issuer in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_publish_flow() -> Result<()> {
///     let server = TestIssuerServer::spawn_default().await?;
///     let token = server.issue_token("tenant", "alice", "read", &[]).await?;
///
///     let response = reqwest::get(server.jwk_url(&kid)).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestIssuerServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl TestIssuerServer {
    /// Spawn a new test server instance with its own key cache
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Warm the key cache to `min_live_keys`
    /// - Start the HTTP server in the background
    pub async fn spawn(config: Config) -> Result<Self, anyhow::Error> {
        let cache = Arc::new(KeyCache::from_config(&config));
        cache
            .ensure_warm()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to warm key cache: {}", e))?;

        let state = Arc::new(AppState::new(config, cache));

        // The global recorder can only be installed once per test process.
        // Later servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => PrometheusBuilder::new().build_recorder().handle(),
        };

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Spawn with two live keys, a one hour key lifetime and fifteen minute
    /// tokens.
    pub async fn spawn_default() -> Result<Self, anyhow::Error> {
        Self::spawn(test_config(2, 3600, 900)).await
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Key publication endpoint, without query string
    pub fn jwk_endpoint(&self) -> String {
        format!("{}/jwk", self.url())
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn token_service(&self) -> &TokenService {
        &self.state.token_service
    }

    pub fn verifier(&self) -> &LocalTokenVerifier {
        &self.state.verifier
    }

    pub fn cache(&self) -> &Arc<KeyCache> {
        self.state.cache()
    }

    /// Issue a token through the server's own issuer.
    pub async fn issue_token(
        &self,
        tenant_id: &str,
        subject: &str,
        scope: &str,
        groups: &[&str],
    ) -> Result<String, anyhow::Error> {
        let request = TokenRequest::new(
            tenant_id,
            subject,
            scope,
            groups.iter().map(|g| g.to_string()).collect(),
        );

        self.state
            .token_service
            .issue(&request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to issue token: {}", e))
    }
}

impl Drop for TestIssuerServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
