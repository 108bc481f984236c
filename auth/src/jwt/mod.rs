pub mod claims;
pub mod errors;
pub mod handler;
pub mod secret;

pub use claims::Claims;
pub use errors::SecretError;
pub use errors::TokenError;
pub use handler::IssuedToken;
pub use handler::TokenIssuer;
pub use handler::TokenVerifier;
pub use secret::SigningSecret;
