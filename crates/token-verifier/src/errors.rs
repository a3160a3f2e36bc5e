use crate::config::ConfigError;
use common::error::TokenError;
use thiserror::Error;

/// Errors raised while setting up a remote verifier.
///
/// Verification itself only ever fails with [`TokenError`].
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}
