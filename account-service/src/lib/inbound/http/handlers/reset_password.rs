use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::session_response;
use super::ApiError;
use crate::account::errors::PasswordPolicyError;
use crate::account::models::Password;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::router::AppState;

/// Complete a password reset with a token from the reset email.
///
/// A successful reset opens a session immediately, so the caller does
/// not have to log in again with the password they just chose.
pub async fn reset_password<R, M>(
    State(state): State<AppState<R, M>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let (token, new_password) = body.try_into_parts()?;

    let session = state
        .account_service
        .reset_password(&token, new_password)
        .await?;

    session_response(StatusCode::OK, &session, &state.cookie_options)
}

/// HTTP request body for a password reset (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequest {
    token: String,
    new_password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseResetPasswordRequestError {
    #[error("Reset token is required")]
    MissingToken,
    #[error(transparent)]
    Password(#[from] PasswordPolicyError),
}

impl ResetPasswordRequest {
    fn try_into_parts(self) -> Result<(String, Password), ParseResetPasswordRequestError> {
        if self.token.trim().is_empty() {
            return Err(ParseResetPasswordRequestError::MissingToken);
        }
        let new_password = Password::new(self.new_password)?;
        Ok((self.token, new_password))
    }
}

impl From<ParseResetPasswordRequestError> for ApiError {
    fn from(err: ParseResetPasswordRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
