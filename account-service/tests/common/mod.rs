use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use account_service::domain::account::errors::MailerError;
use account_service::domain::account::lockout::LockoutPolicy;
use account_service::domain::account::models::Account;
use account_service::domain::account::models::EmailAddress;
use account_service::domain::account::ports::AccountRepository;
use account_service::domain::account::ports::Mailer;
use account_service::domain::account::service::AccountService;
use account_service::inbound::http::middleware::authenticate;
use account_service::inbound::http::middleware::require_admin;
use account_service::inbound::http::middleware::require_subscription;
use account_service::inbound::http::rate_limit::FixedWindowLimiter;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::inbound::http::session::CookieOptions;
use account_service::outbound::repositories::InMemoryAccountRepository;
use async_trait::async_trait;
use auth::HashCost;
use auth::PasswordHasher;
use auth::SigningSecret;
use auth::TokenIssuer;
use auth::TokenVerifier;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

const TEST_SIGNING_SECRET: &str = "test-secret-key-for-jwt-signing-at-least-32-bytes";
const TOKEN_ISSUER: &str = "coursehub-api";
const TOKEN_AUDIENCE: &str = "coursehub";

/// Test application that spawns a real server over the in-memory adapters
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub repository: Arc<InMemoryAccountRepository>,
    pub mailer: Arc<RecordingMailer>,
    pub password_hasher: PasswordHasher,
    signing_secret: SigningSecret,
}

/// Mailer that captures outbound tokens so tests can redeem them.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    verification: Mutex<Vec<(String, String)>>,
    resets: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn latest_verification_token(&self, email: &str) -> Option<String> {
        Self::latest(&self.verification, email)
    }

    pub fn latest_reset_token(&self, email: &str) -> Option<String> {
        Self::latest(&self.resets, email)
    }

    pub fn reset_mail_count(&self) -> usize {
        self.resets.lock().unwrap().len()
    }

    fn latest(messages: &Mutex<Vec<(String, String)>>, email: &str) -> Option<String> {
        messages
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(recipient, _)| recipient == email)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email_verification(&self, email: &str, token: &str) -> Result<(), MailerError> {
        self.verification
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailerError> {
        self.resets
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let repository = Arc::new(InMemoryAccountRepository::new());
        let mailer = Arc::new(RecordingMailer::default());

        let signing_secret =
            SigningSecret::new(TEST_SIGNING_SECRET).expect("Invalid test signing secret");
        let password_hasher = PasswordHasher::new(HashCost::development());
        let token_issuer = TokenIssuer::new(
            &signing_secret,
            TOKEN_ISSUER,
            TOKEN_AUDIENCE,
            Duration::days(7),
        );
        let token_verifier = Arc::new(TokenVerifier::new(
            &signing_secret,
            TOKEN_ISSUER,
            TOKEN_AUDIENCE,
        ));

        let account_service = Arc::new(AccountService::new(
            Arc::clone(&repository),
            Arc::clone(&mailer),
            password_hasher.clone(),
            token_issuer,
            LockoutPolicy::default(),
        ));

        let rate_limiter = Arc::new(FixedWindowLimiter::new());
        let cookie_options = CookieOptions {
            secure: false,
            same_site_strict: false,
            max_age_secs: 7 * 24 * 60 * 60,
        };

        let router = create_router(
            Arc::clone(&account_service),
            Arc::clone(&token_verifier),
            Arc::clone(&rate_limiter),
            cookie_options,
        )
        .merge(gate_probe_routes(AppState {
            account_service,
            token_verifier,
            rate_limiter,
            cookie_options,
        }));

        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            repository,
            mailer,
            password_hasher,
            signing_secret,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.put(path).bearer_auth(token)
    }

    /// Register through the API and return the session token.
    pub async fn register_account(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .post("/api/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("Missing session token")
            .to_string()
    }

    /// Log in through the API and return the session token.
    pub async fn login_account(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("Missing session token")
            .to_string()
    }

    /// Insert an account directly into the store, bypassing the HTTP
    /// surface. `customize` runs on the fresh account before insertion, so
    /// tests can backdate trials or pre-fill lockout state.
    pub async fn seed_account<F>(&self, name: &str, email: &str, password: &str, customize: F) -> Account
    where
        F: FnOnce(&mut Account),
    {
        let secret_hash = self
            .password_hasher
            .hash(password)
            .expect("Failed to hash password");
        let mut account = Account::new(
            name.to_string(),
            EmailAddress::new(email.to_string()).expect("Invalid test email"),
            secret_hash,
            Utc::now(),
        );
        customize(&mut account);

        self.repository
            .create(account)
            .await
            .expect("Failed to seed account")
    }

    /// Issue a token that is already past its expiry, signed with the
    /// application key.
    pub fn expired_token(&self, account: &Account) -> String {
        let issuer = TokenIssuer::new(
            &self.signing_secret,
            TOKEN_ISSUER,
            TOKEN_AUDIENCE,
            Duration::hours(-2),
        );
        issuer
            .issue(
                &account.id.to_string(),
                account.email.as_str(),
                account.role.as_str(),
                Utc::now(),
            )
            .expect("Failed to issue token")
            .token
    }
}

/// Routes that exist only in tests: trivial handlers sitting behind the
/// authorization gates, mounted the way the content services mount them.
fn gate_probe_routes(state: AppState<InMemoryAccountRepository, RecordingMailer>) -> Router {
    let subscriber_routes = Router::new()
        .route("/api/content/sample", get(|| async { "sample content" }))
        .route_layer(middleware::from_fn(require_subscription));

    let admin_routes = Router::new()
        .route("/api/admin/overview", get(|| async { "admin overview" }))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(subscriber_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state,
            authenticate::<InMemoryAccountRepository, RecordingMailer>,
        ))
}
