use std::sync::Arc;
use std::time::Duration;

use auth::TokenVerifier;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::forgot_password::forgot_password;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::me::me;
use super::handlers::register::register;
use super::handlers::reset_password::reset_password;
use super::handlers::subscription::subscription;
use super::handlers::update_password::update_password;
use super::handlers::verify_email::verify_email;
use super::middleware::authenticate;
use super::rate_limit::rate_limit;
use super::rate_limit::FixedWindowLimiter;
use super::rate_limit::RateLimitClass;
use super::session::CookieOptions;
use crate::account::ports::AccountRepository;
use crate::account::ports::Mailer;
use crate::account::service::AccountService;

/// Shared state behind every route.
///
/// Generic over the repository and mailer ports, the integration tests run
/// the full router against the in-memory adapters.
pub struct AppState<R, M>
where
    R: AccountRepository,
    M: Mailer,
{
    pub account_service: Arc<AccountService<R, M>>,
    pub token_verifier: Arc<TokenVerifier>,
    pub rate_limiter: Arc<FixedWindowLimiter>,
    pub cookie_options: CookieOptions,
}

impl<R, M> Clone for AppState<R, M>
where
    R: AccountRepository,
    M: Mailer,
{
    fn clone(&self) -> Self {
        Self {
            account_service: Arc::clone(&self.account_service),
            token_verifier: Arc::clone(&self.token_verifier),
            rate_limiter: Arc::clone(&self.rate_limiter),
            cookie_options: self.cookie_options,
        }
    }
}

pub fn create_router<R, M>(
    account_service: Arc<AccountService<R, M>>,
    token_verifier: Arc<TokenVerifier>,
    rate_limiter: Arc<FixedWindowLimiter>,
    cookie_options: CookieOptions,
) -> Router
where
    R: AccountRepository,
    M: Mailer,
{
    let state = AppState {
        account_service,
        token_verifier,
        rate_limiter: Arc::clone(&rate_limiter),
        cookie_options,
    };

    let limit = |class: RateLimitClass| {
        middleware::from_fn_with_state((Arc::clone(&rate_limiter), class), rate_limit)
    };

    let public_routes = Router::new()
        .route(
            "/api/auth/register",
            post(register::<R, M>).route_layer(limit(RateLimitClass::Registration)),
        )
        .route(
            "/api/auth/login",
            post(login::<R, M>).route_layer(limit(RateLimitClass::Login)),
        )
        .route(
            "/api/auth/forgot-password",
            post(forgot_password::<R, M>).route_layer(limit(RateLimitClass::PasswordReset)),
        )
        .route(
            "/api/auth/reset-password",
            post(reset_password::<R, M>).route_layer(limit(RateLimitClass::PasswordReset)),
        )
        .route("/api/auth/verify-email", post(verify_email::<R, M>));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout::<R, M>))
        .route("/api/auth/password", put(update_password::<R, M>))
        .route("/api/auth/subscription", get(subscription))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate::<R, M>,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(limit(RateLimitClass::General))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
