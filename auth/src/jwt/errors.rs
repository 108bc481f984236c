use thiserror::Error;

/// Error type for session token operations.
///
/// `Expired` is deliberately separate from `Invalid`: callers surface
/// different error codes for the two cases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Token is expired")]
    Expired,

    #[error("Token is invalid: {0}")]
    Invalid(String),
}

/// Error type for signing-secret validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("Signing secret is too short: {actual} bytes, need at least {min}")]
    TooShort { actual: usize, min: usize },

    #[error("Signing secret is a well-known placeholder value")]
    Placeholder,
}
