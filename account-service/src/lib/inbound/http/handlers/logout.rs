use axum::extract::State;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::account::ports::AccountRepository;
use crate::account::ports::Mailer;
use crate::inbound::http::router::AppState;
use crate::inbound::http::session;

/// Replace the session cookie with a cleared one that expires in seconds.
///
/// The token itself stays valid until its `exp`, stateless sessions have
/// nothing to revoke server side.
pub async fn logout<R, M>(State(state): State<AppState<R, M>>) -> Result<Response, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let cookie = session::clear_session_cookie(&state.cookie_options);
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalServerError(format!("Session cookie invalid: {}", e)))?;

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        MessageData {
            message: "Logged out".to_string(),
        },
    )
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}
