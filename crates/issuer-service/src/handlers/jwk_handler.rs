//! Key publication handlers.
//!
//! Remote verifiers fetch one key at a time from `/jwk?kid=`. The full set
//! at `/.well-known/jwks.json` is for operators and standard JWKS clients.

use crate::errors::IssuerError;
use crate::models::JwkQuery;
use crate::observability::metrics::record_jwk_request;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use common::jwk::{JwkRecord, JwkSet};
use std::sync::Arc;
use tracing::instrument;

/// Handle single key request
///
/// GET /jwk?kid=<id>
///
/// Returns 200 with `{kty,crv,kid,x}`, 404 if the key is unknown or its
/// public half has expired, 400 if `kid` is missing or empty.
#[instrument(name = "issuer.jwk.get", skip_all, fields(status))]
pub async fn handle_get_jwk(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JwkQuery>,
) -> Result<Json<JwkRecord>, IssuerError> {
    let Some(kid) = query.kid.filter(|kid| !kid.is_empty()) else {
        tracing::Span::current().record("status", "bad_request");
        record_jwk_request("bad_request");
        return Err(IssuerError::BadRequest("Missing kid parameter".to_string()));
    };

    let result = state.token_service.publish_key(&kid).await;

    let status = match &result {
        Ok(_) => "success",
        Err(IssuerError::UnknownKey(_)) => "not_found",
        Err(_) => "error",
    };
    tracing::Span::current().record("status", status);
    record_jwk_request(status);

    Ok(Json(result?))
}

/// Handle JWKS request
///
/// GET /.well-known/jwks.json
///
/// Returns every key pair still verifiable, newest first. Keys rotate at
/// least once per key lifetime, so downstream caching is capped at 60s.
#[instrument(name = "issuer.jwks.get", skip_all)]
pub async fn handle_get_jwks(State(state): State<Arc<AppState>>) -> (HeaderMap, Json<JwkSet>) {
    let jwks = state
        .token_service
        .publish_all_at(chrono::Utc::now().timestamp())
        .await;
    record_jwk_request("success");

    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));

    (headers, Json(jwks))
}
