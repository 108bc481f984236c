use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::session_response;
use super::ApiError;
use crate::account::errors::PasswordPolicyError;
use crate::account::models::ChangePasswordCommand;
use crate::account::models::Password;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::middleware::CurrentAccount;
use crate::inbound::http::router::AppState;

/// Change the caller's password and rotate the session.
pub async fn update_password<R, M>(
    State(state): State<AppState<R, M>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Response, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let session = state
        .account_service
        .change_password(&account.id, body.try_into_command()?)
        .await?;

    session_response(StatusCode::OK, &session, &state.cookie_options)
}

/// HTTP request body for a password change (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdatePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseUpdatePasswordRequestError {
    #[error(transparent)]
    Password(#[from] PasswordPolicyError),
}

impl UpdatePasswordRequest {
    fn try_into_command(self) -> Result<ChangePasswordCommand, ParseUpdatePasswordRequestError> {
        let new_password = Password::new(self.new_password)?;
        Ok(ChangePasswordCommand::new(self.current_password, new_password))
    }
}

impl From<ParseUpdatePasswordRequestError> for ApiError {
    fn from(err: ParseUpdatePasswordRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
