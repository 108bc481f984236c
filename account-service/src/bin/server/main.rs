use std::net::SocketAddr;
use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::account::lockout::LockoutPolicy;
use account_service::domain::account::service::AccountService;
use account_service::inbound::http::rate_limit::FixedWindowLimiter;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::session::CookieOptions;
use account_service::outbound::mailer::LoggingMailer;
use account_service::outbound::repositories::PostgresAccountRepository;
use auth::HashCost;
use auth::PasswordHasher;
use auth::TokenIssuer;
use auth::TokenVerifier;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        environment = ?config.environment,
        http_port = config.server.http_port,
        "Configuration loaded"
    );

    // Fails startup in production when the secret is weak.
    let signing_secret = config.jwt.signing_secret(config.environment)?;

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let hash_cost = if config.environment.is_production() {
        HashCost::production()
    } else {
        HashCost::development()
    };
    let password_hasher = PasswordHasher::new(hash_cost);
    let token_issuer = TokenIssuer::new(
        &signing_secret,
        &config.jwt.issuer,
        &config.jwt.audience,
        Duration::days(config.jwt.expiration_days),
    );
    let token_verifier = Arc::new(TokenVerifier::new(
        &signing_secret,
        &config.jwt.issuer,
        &config.jwt.audience,
    ));

    let account_repository = Arc::new(PostgresAccountRepository::new(pg_pool));
    let mailer = Arc::new(LoggingMailer::new());

    let account_service = Arc::new(AccountService::new(
        account_repository,
        mailer,
        password_hasher,
        token_issuer,
        LockoutPolicy::default(),
    ));

    let rate_limiter = Arc::new(FixedWindowLimiter::new());
    let cookie_options = CookieOptions {
        secure: config.environment.is_production(),
        same_site_strict: config.environment.is_production(),
        max_age_secs: config.jwt.expiration_days * 24 * 60 * 60,
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(
        account_service,
        token_verifier,
        rate_limiter,
        cookie_options,
    );

    axum::serve(
        http_listener,
        application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
