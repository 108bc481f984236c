//! Account security primitives
//!
//! Provides the credential and session-token infrastructure used by the
//! account service:
//! - Password hashing (Argon2id, with environment-tiered cost profiles)
//! - Signed session tokens (JWT, HS256) with issuer and audience enforcement
//! - Signing-secret validation
//!
//! The service defines its own domain ports and adapts these implementations.
//! Nothing in here knows about accounts, lockout, or HTTP.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::password::{HashCost, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(HashCost::development());
//! let hash = hasher.hash("correct horse battery staple").unwrap();
//! assert!(hasher.verify("correct horse battery staple", &hash).unwrap());
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::jwt::{SigningSecret, TokenIssuer, TokenVerifier};
//! use chrono::{Duration, Utc};
//!
//! let secret = SigningSecret::new("an-example-signing-key-of-32-bytes!").unwrap();
//! let issuer = TokenIssuer::new(&secret, "coursehub-api", "coursehub", Duration::days(7));
//! let verifier = TokenVerifier::new(&secret, "coursehub-api", "coursehub");
//!
//! let issued = issuer
//!     .issue("account-id", "user@example.com", "standard", Utc::now())
//!     .unwrap();
//! let claims = verifier.verify(&issued.token).unwrap();
//! assert_eq!(claims.sub, "account-id");
//! ```

pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::SecretError;
pub use jwt::SigningSecret;
pub use jwt::TokenError;
pub use jwt::TokenIssuer;
pub use jwt::TokenVerifier;
pub use password::HashCost;
pub use password::PasswordError;
pub use password::PasswordHasher;
