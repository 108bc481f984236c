//! Fixed-window request limiting.
//!
//! Counters live in process memory keyed by `(endpoint class, client key)`.
//! That is correct for a single instance; running several replicas needs a
//! shared counter store instead.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::inbound::http::handlers::codes;

/// Endpoint classes with their own budgets.
///
/// Login refunds successful requests: only failed attempts spend budget,
/// and a shared egress address stays usable for everyone behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    General,
    Login,
    Registration,
    PasswordReset,
    CodeExecution,
    CodeExecutionAnonymous,
}

impl RateLimitClass {
    pub fn window(&self) -> Duration {
        match self {
            RateLimitClass::General | RateLimitClass::Login => Duration::from_secs(15 * 60),
            RateLimitClass::Registration | RateLimitClass::PasswordReset => {
                Duration::from_secs(60 * 60)
            }
            RateLimitClass::CodeExecution | RateLimitClass::CodeExecutionAnonymous => {
                Duration::from_secs(60)
            }
        }
    }

    pub fn max_requests(&self) -> u32 {
        match self {
            RateLimitClass::General => 100,
            RateLimitClass::Login => 5,
            RateLimitClass::Registration => 5,
            RateLimitClass::PasswordReset => 3,
            RateLimitClass::CodeExecution => 30,
            RateLimitClass::CodeExecutionAnonymous => 10,
        }
    }

    /// Whether a success refunds the request it consumed.
    pub fn skips_successful(&self) -> bool {
        matches!(self, RateLimitClass::Login)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitClass::General => "general",
            RateLimitClass::Login => "login",
            RateLimitClass::Registration => "registration",
            RateLimitClass::PasswordReset => "password_reset",
            RateLimitClass::CodeExecution => "code_execution",
            RateLimitClass::CodeExecutionAnonymous => "code_execution_anonymous",
        }
    }
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Keys tracked before finished windows get evicted.
const MAX_TRACKED_KEYS: usize = 8192;

/// In-process fixed-window limiter over all endpoint classes.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<(RateLimitClass, String), Window>>,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend one request from the `(class, key)` budget.
    pub fn check(&self, class: RateLimitClass, key: &str) -> Decision {
        self.check_at(class, key, Instant::now())
    }

    /// Same as [`check`](Self::check) with the clock passed in.
    pub fn check_at(&self, class: RateLimitClass, key: &str, now: Instant) -> Decision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() >= MAX_TRACKED_KEYS {
            windows.retain(|(class, _), window| {
                now.duration_since(window.started_at) < class.window()
            });
        }

        let window = windows
            .entry((class, key.to_string()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now.duration_since(window.started_at) >= class.window() {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= class.max_requests() {
            let elapsed = now.duration_since(window.started_at);
            return Decision::Limited {
                retry_after: class.window().saturating_sub(elapsed),
            };
        }

        window.count += 1;
        Decision::Allowed
    }

    /// Return one spent request to the budget.
    pub fn forgive(&self, class: RateLimitClass, key: &str) {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(window) = windows.get_mut(&(class, key.to_string())) {
            window.count = window.count.saturating_sub(1);
        }
    }
}

/// Client address for limiter keys and the login audit trail.
///
/// The first `X-Forwarded-For` entry wins, the service expects to sit
/// behind a reverse proxy that sets it. Falls back to the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    client_ip(headers, peer).unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing one limiter class on the wrapped routes.
pub async fn rate_limit(
    State((limiter, class)): State<(Arc<FixedWindowLimiter>, RateLimitClass)>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    match limiter.check(class, &key) {
        Decision::Limited { retry_after } => {
            tracing::warn!(class = class.as_str(), key = %key, "Request rate limited");
            limited_response(retry_after)
        }
        Decision::Allowed => {
            let response = next.run(request).await;
            if class.skips_successful() && response.status().is_success() {
                limiter.forgive(class, &key);
            }
            response
        }
    }
}

fn limited_response(retry_after: Duration) -> Response {
    let retry_after_secs = retry_after.as_secs().max(1);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after_secs.to_string())],
        Json(json!({
            "status_code": StatusCode::TOO_MANY_REQUESTS.as_u16(),
            "data": {
                "message": "Too many requests, please try again later",
                "code": codes::RATE_LIMITED,
                "retry_after_secs": retry_after_secs,
            }
        })),
    )
        .into_response()
}
