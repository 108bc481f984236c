//! Session cookie handling.
//!
//! The session token travels either as a bearer header or as an http-only
//! cookie. The bearer header wins when both are present.

use axum::http::header;
use axum::http::HeaderMap;

pub const SESSION_COOKIE_NAME: &str = "coursehub_session";

/// Lifetime of the cleared cookie set on logout. Long enough for every
/// in-flight response to observe the cleared value, short enough to expire
/// right after.
pub const LOGOUT_COOKIE_MAX_AGE_SECS: i64 = 10;

/// Cookie attributes that vary by environment.
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site_strict: bool,
    pub max_age_secs: i64,
}

impl CookieOptions {
    fn same_site(&self) -> &'static str {
        if self.same_site_strict {
            "Strict"
        } else {
            "Lax"
        }
    }
}

/// Build the http-only session cookie carrying `token`.
pub fn session_cookie(token: &str, options: &CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        SESSION_COOKIE_NAME,
        token,
        options.same_site(),
        options.max_age_secs
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the replacement cookie that logs a client out.
pub fn clear_session_cookie(options: &CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        SESSION_COOKIE_NAME,
        options.same_site(),
        LOGOUT_COOKIE_MAX_AGE_SECS
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the session token out of the request headers.
///
/// An empty cookie value counts as no token at all, which is exactly what
/// a logged-out client sends until the cleared cookie expires.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie_token(headers))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let Some((name, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if name.trim() == SESSION_COOKIE_NAME {
            let val = val.trim();
            if val.is_empty() {
                return None;
            }
            return Some(val.to_string());
        }
    }
    None
}
