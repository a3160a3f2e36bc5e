use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::TokenError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssuerError {
    /// The cache holds no privately live key pair.
    #[error("No signing key available")]
    NoSigningKeyAvailable,

    /// Issuance failed because no key pair can sign.
    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),

    /// The key pair does not exist or its public half has expired.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl IssuerError {
    /// Wrap a key selection failure the way the issuer reports it.
    #[must_use]
    pub fn into_signing_unavailable(self) -> Self {
        match self {
            IssuerError::NoSigningKeyAvailable => {
                IssuerError::SigningUnavailable("no signing key available".to_string())
            }
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IssuerError::UnknownKey(_) => StatusCode::NOT_FOUND,
            IssuerError::BadRequest(_) | IssuerError::Token(TokenError::MalformedToken(_)) => {
                StatusCode::BAD_REQUEST
            }
            IssuerError::NoSigningKeyAvailable
            | IssuerError::SigningUnavailable(_)
            | IssuerError::Crypto(_)
            | IssuerError::Token(_)
            | IssuerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            IssuerError::NoSigningKeyAvailable | IssuerError::SigningUnavailable(_) => (
                "SIGNING_UNAVAILABLE",
                "No signing key is currently available".to_string(),
            ),
            IssuerError::UnknownKey(_) => ("KEY_NOT_FOUND", "Key not found".to_string()),
            IssuerError::Crypto(_) => (
                "CRYPTO_ERROR",
                "An internal cryptographic error occurred".to_string(),
            ),
            IssuerError::BadRequest(reason) => ("BAD_REQUEST", reason.clone()),
            IssuerError::Token(TokenError::MalformedToken(_)) => {
                ("INVALID_TOKEN", "The token is malformed".to_string())
            }
            IssuerError::Token(_) | IssuerError::Internal => {
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
