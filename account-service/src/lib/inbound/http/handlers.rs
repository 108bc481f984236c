use auth::TokenError;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AuthenticatedAccount;
use crate::inbound::http::session;
use crate::inbound::http::session::CookieOptions;

pub mod forgot_password;
pub mod login;
pub mod logout;
pub mod me;
pub mod register;
pub mod reset_password;
pub mod subscription;
pub mod update_password;
pub mod verify_email;

/// Machine-readable error codes carried alongside the human message.
pub mod codes {
    pub const NO_TOKEN: &str = "NO_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const ACCOUNT_DEACTIVATED: &str = "ACCOUNT_DEACTIVATED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const ACCOUNT_LOCKED: &str = "ACCOUNT_LOCKED";
    pub const SUBSCRIPTION_REQUIRED: &str = "SUBSCRIPTION_REQUIRED";
    pub const ADMIN_REQUIRED: &str = "ADMIN_REQUIRED";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
}

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized {
        code: &'static str,
        message: String,
    },
    Forbidden {
        code: &'static str,
        message: String,
    },
    Locked(String),
    InternalServerError(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            ApiError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, Some(code), message)
            }
            ApiError::Forbidden { code, message } => (StatusCode::FORBIDDEN, Some(code), message),
            ApiError::Locked(msg) => (StatusCode::LOCKED, Some(codes::ACCOUNT_LOCKED), msg),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ApiResponseBody::new_error(status, message, code)),
        )
            .into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidEmail(_)
            | AccountError::WeakPassword(_)
            | AccountError::SamePassword
            | AccountError::EmailAlreadyExists
            | AccountError::InvalidResetToken
            | AccountError::InvalidVerifyToken
            | AccountError::InvalidAccountId(_) => ApiError::BadRequest(err.to_string()),
            AccountError::InvalidCredentials | AccountError::WrongCurrentPassword => {
                ApiError::Unauthorized {
                    code: codes::INVALID_CREDENTIALS,
                    message: err.to_string(),
                }
            }
            AccountError::AccountDeactivated => ApiError::Unauthorized {
                code: codes::ACCOUNT_DEACTIVATED,
                message: err.to_string(),
            },
            AccountError::AccountLocked { .. } => ApiError::Locked(err.to_string()),
            AccountError::NotFound => ApiError::Unauthorized {
                code: codes::USER_NOT_FOUND,
                message: err.to_string(),
            },
            AccountError::Token(TokenError::Expired) => ApiError::Unauthorized {
                code: codes::TOKEN_EXPIRED,
                message: "Authentication token has expired".to_string(),
            },
            AccountError::Token(TokenError::Invalid(_)) => ApiError::Unauthorized {
                code: codes::INVALID_TOKEN,
                message: "Authentication token is invalid".to_string(),
            },
            AccountError::Token(TokenError::Encoding(_))
            | AccountError::InvalidRole(_)
            | AccountError::Hashing(_)
            | AccountError::Database(_)
            | AccountError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String, code: Option<&'static str>) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message, code },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Safe projection of an account for response bodies.
///
/// Never carries the password hash, the token digests, or the lockout
/// counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub email_verified: bool,
    pub is_subscribed: bool,
    pub trial_start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountData {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.to_string(),
            role: account.role.to_string(),
            email_verified: account.email_verified,
            is_subscribed: account.is_subscribed,
            trial_start_date: account.trial_start_date,
            created_at: account.created_at,
        }
    }
}

/// Body shape shared by the session-opening endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub token: String,
    pub user: AccountData,
}

impl From<&AuthenticatedAccount> for SessionData {
    fn from(session: &AuthenticatedAccount) -> Self {
        Self {
            token: session.token.clone(),
            user: AccountData::from(&session.account),
        }
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

/// Success response that also sets the session cookie.
pub(crate) fn session_response(
    status: StatusCode,
    session: &AuthenticatedAccount,
    options: &CookieOptions,
) -> Result<Response, ApiError> {
    let cookie = session::session_cookie(&session.token, options);
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalServerError(format!("Session cookie invalid: {}", e)))?;

    let mut response = ApiSuccess::new(status, SessionData::from(session)).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}
