use std::env;

use auth::SecretError;
use auth::SigningSecret;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment as EnvironmentSource;
use config::File;
use serde::Deserialize;

/// Application configuration for account-service.
///
/// Loaded from configuration files with environment variable overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
}

/// Deployment environment the service is running in.
///
/// Selects the password hashing cost profile, cookie attributes, and how
/// strictly the JWT secret is checked at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// PostgreSQL database configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Session token configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_days: i64,
}

impl JwtConfig {
    /// Validate the configured secret and turn it into signing material.
    ///
    /// In production a weak secret is a startup error. Elsewhere it is
    /// logged and tolerated so local setups keep working.
    ///
    /// # Errors
    /// Returns error if the secret fails strength checks in production
    pub fn signing_secret(&self, environment: Environment) -> Result<SigningSecret, SecretError> {
        if environment.is_production() {
            return SigningSecret::new(self.secret.clone());
        }

        match SigningSecret::new(self.secret.clone()) {
            Ok(secret) => Ok(secret),
            Err(err) => {
                tracing::warn!(
                    "JWT secret fails strength checks ({}), tolerated outside production",
                    err
                );
                Ok(SigningSecret::allow_weak(self.secret.clone()))
            }
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(EnvironmentSource::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}
