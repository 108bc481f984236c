use std::fmt;

use super::errors::SecretError;

/// Exact-match deny list of secrets that ship in tutorials and `.env`
/// templates. Compared case-insensitively.
const PLACEHOLDER_SECRETS: [&str; 8] = [
    "secret",
    "changeme",
    "change-me",
    "password",
    "jwt-secret",
    "your-secret-key",
    "your-256-bit-secret",
    "replace-me-with-a-real-secret-value",
];

/// Validated HMAC signing secret for session tokens.
///
/// The raw value never appears in `Debug` output.
pub struct SigningSecret(String);

impl SigningSecret {
    /// Minimum secret length in bytes for HS256.
    pub const MIN_LENGTH: usize = 32;

    /// Create a signing secret, rejecting weak values.
    ///
    /// # Errors
    /// * `Placeholder` - Value matches a well-known placeholder
    /// * `TooShort` - Value is shorter than [`Self::MIN_LENGTH`] bytes
    pub fn new(value: impl Into<String>) -> Result<Self, SecretError> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Create a signing secret without strength checks.
    ///
    /// Intended for development environments where the caller has already
    /// decided (and logged) that a weak secret is tolerable. Production
    /// startup paths must use [`Self::new`].
    pub fn allow_weak(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Check a candidate value against the strength rules.
    pub fn validate(value: &str) -> Result<(), SecretError> {
        let lowered = value.to_lowercase();
        if PLACEHOLDER_SECRETS.contains(&lowered.as_str()) {
            return Err(SecretError::Placeholder);
        }
        if value.len() < Self::MIN_LENGTH {
            return Err(SecretError::TooShort {
                actual: value.len(),
                min: Self::MIN_LENGTH,
            });
        }
        Ok(())
    }

    /// Key material for the JWT encoder and decoder.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}
