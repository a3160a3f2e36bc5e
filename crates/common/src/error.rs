//! Token protocol error types.

use thiserror::Error;

/// Hard failures of the token protocol.
///
/// Semantic rejection (unknown key, bad signature, expired token) is not an
/// error: verification returns `Ok(None)` for all three so callers cannot tell
/// why a token was refused. Only structural problems and remote key-resolution
/// failures surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token is structurally invalid (segment count, encoding, missing field).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The key-publication endpoint could not be reached or answered badly.
    #[error("Key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// A published key record could not be turned into a public key.
    #[error("Key decode failed: {0}")]
    KeyDecodeFailed(String),
}

/// Result type alias using `TokenError`
pub type Result<T> = std::result::Result<T, TokenError>;
