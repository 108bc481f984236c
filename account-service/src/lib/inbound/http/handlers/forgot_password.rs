use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::account::models::EmailAddress;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::router::AppState;

/// Start a password reset for the given email.
///
/// The response is the same whether or not the email belongs to an
/// account, so the endpoint cannot be used to probe for registered
/// addresses. Only a syntactically invalid email is rejected.
pub async fn forgot_password<R, M>(
    State(state): State<AppState<R, M>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<ApiSuccess<MessageData>, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let email = EmailAddress::new(body.email).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .account_service
        .request_password_reset(email.as_str())
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData {
            message: "If that email is registered, a password reset link has been sent".to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: String,
}
