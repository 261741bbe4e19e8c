//! Error types for token and password operations.

/// Errors produced by the token authority and password hasher.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is malformed, expired, or its signature does not match.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Key material could not be converted for signing or verification.
    #[error("Key error: {0}")]
    Key(String),

    /// `issued_at + ttl` falls outside the representable date range.
    #[error("Token lifetime out of range: {0}")]
    TtlOutOfRange(String),

    #[error("Token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}
