use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::session_response;
use super::ApiError;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::rate_limit;
use crate::inbound::http::router::AppState;

/// Submitted credentials stay raw strings here. A malformed email cannot
/// match any stored account, so it falls into the same generic rejection
/// as a wrong password instead of a validation error.
pub async fn login<R, M>(
    State(state): State<AppState<R, M>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let client_ip = rate_limit::client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let session = state
        .account_service
        .login(&body.email, &body.password, client_ip)
        .await?;

    session_response(StatusCode::OK, &session, &state.cookie_options)
}

/// HTTP request body for login (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}
