use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::router::AppState;

/// Confirm an email address with a token from the verification email.
pub async fn verify_email<R, M>(
    State(state): State<AppState<R, M>>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<ApiSuccess<MessageData>, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    state.account_service.verify_email(&body.token).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData {
            message: "Email address verified".to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyEmailRequest {
    token: String,
}
