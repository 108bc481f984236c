use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::TokenError;
use super::secret::SigningSecret;

/// A freshly minted session token together with its claims.
///
/// The claims are returned so callers can derive cookie lifetimes from
/// `exp` without decoding the token again.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Mints signed session tokens.
///
/// Uses HS256 (HMAC with SHA-256). Issuer, audience, and time-to-live are
/// fixed at construction so every token this instance produces carries the
/// same provenance.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create a new token issuer.
    ///
    /// # Arguments
    /// * `secret` - Validated signing secret
    /// * `issuer` - Value for the `iss` claim
    /// * `audience` - Value for the `aud` claim
    /// * `ttl` - Token lifetime
    pub fn new(
        secret: &SigningSecret,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
        }
    }

    /// Token lifetime this issuer stamps into `exp`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session token for an account.
    ///
    /// # Arguments
    /// * `subject` - Account identifier for the `sub` claim
    /// * `email` - Account email at time of issue
    /// * `role` - Account role at time of issue
    /// * `now` - Issue time
    ///
    /// # Errors
    /// * `Encoding` - Token signing failed
    pub fn issue(
        &self,
        subject: &str,
        email: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::session(
            subject,
            email,
            role,
            self.issuer.clone(),
            self.audience.clone(),
            now,
            self.ttl,
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }
}

/// Validates session tokens and extracts their claims.
///
/// Rejects tokens whose signature, expiry, issuer, or audience do not
/// check out. Expiry is reported as [`TokenError::Expired`]; every other
/// failure collapses into [`TokenError::Invalid`] so callers cannot
/// distinguish a forged token from a malformed one.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a new token verifier.
    ///
    /// # Arguments
    /// * `secret` - Validated signing secret (must match the issuer's)
    /// * `issuer` - Expected `iss` claim
    /// * `audience` - Expected `aud` claim
    pub fn new(secret: &SigningSecret, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate a session token.
    ///
    /// # Errors
    /// * `Expired` - Signature is valid but the token is past its expiry
    /// * `Invalid` - Bad signature, wrong issuer or audience, malformed token
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}
