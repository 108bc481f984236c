use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Session token claims.
///
/// Every field is required. Tokens missing any of them fail verification,
/// which keeps tokens minted for other services (or by older builds) out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the account identifier.
    pub sub: String,

    /// Email address at the time of issue.
    pub email: String,

    /// Account role at the time of issue.
    pub role: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,
}

impl Claims {
    /// Create session claims expiring `ttl` after `now`.
    pub fn session(
        subject: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.into(),
            email: email.into(),
            role: role.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: issuer.into(),
            aud: audience.into(),
        }
    }

    /// Expiration as a UTC timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
