use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::session_response;
use super::ApiError;
use crate::account::errors::EmailError;
use crate::account::errors::PasswordPolicyError;
use crate::account::models::EmailAddress;
use crate::account::models::Password;
use crate::account::models::RegisterCommand;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::router::AppState;

pub async fn register<R, M>(
    State(state): State<AppState<R, M>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, ApiError>
where
    R: AccountRepository,
    M: Mailer,
{
    let session = state
        .account_service
        .register(body.try_into_command()?)
        .await?;

    session_response(StatusCode::CREATED, &session, &state.cookie_options)
}

/// HTTP request body for registration (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

const NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Name must be between 1 and 100 characters")]
    InvalidName,

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Password(#[from] PasswordPolicyError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > NAME_MAX_LENGTH {
            return Err(ParseRegisterRequestError::InvalidName);
        }
        let email = EmailAddress::new(self.email)?;
        let password = Password::new(self.password)?;
        Ok(RegisterCommand::new(name, email, password))
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
