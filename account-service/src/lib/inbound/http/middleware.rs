use auth::TokenError;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;

use crate::account::access;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::Role;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::inbound::http::handlers::codes;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::inbound::http::session;

/// Live account of the authenticated caller, inserted by [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Require a valid session token and a live account.
///
/// The account is re-read on every request, so deactivation and role
/// changes bite immediately instead of waiting for the token to expire.
pub async fn authenticate<R, M>(
    State(state): State<AppState<R, M>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response>
where
    R: AccountRepository,
    M: Mailer,
{
    let Some(token) = session::extract_token(request.headers()) else {
        return Err(unauthorized(
            codes::NO_TOKEN,
            "Authentication token is missing",
        ));
    };

    let claims = state.token_verifier.verify(&token).map_err(|e| match e {
        TokenError::Expired => unauthorized(
            codes::TOKEN_EXPIRED,
            "Authentication token has expired",
        ),
        _ => {
            tracing::warn!("Rejected invalid session token");
            unauthorized(codes::INVALID_TOKEN, "Authentication token is invalid")
        }
    })?;

    let account_id = AccountId::from_string(&claims.sub)
        .map_err(|_| unauthorized(codes::INVALID_TOKEN, "Authentication token is invalid"))?;

    let account = state
        .account_service
        .get_account(&account_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?
        .ok_or_else(|| unauthorized(codes::USER_NOT_FOUND, "Account no longer exists"))?;

    if !account.is_active {
        return Err(unauthorized(
            codes::ACCOUNT_DEACTIVATED,
            "Account has been deactivated",
        ));
    }

    request.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(request).await)
}

/// Require an account with content access: subscribed or inside the trial.
///
/// Composes after [`authenticate`], which provides the account.
pub async fn require_subscription(request: Request, next: Next) -> Result<Response, Response> {
    let account = current_account(&request)?;

    if !access::has_access(&account, Utc::now()) {
        return Err(ApiError::Forbidden {
            code: codes::SUBSCRIPTION_REQUIRED,
            message: "An active subscription is required to access this resource".to_string(),
        }
        .into_response());
    }

    Ok(next.run(request).await)
}

/// Require the admin role. Composes after [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, Response> {
    let account = current_account(&request)?;

    if account.role != Role::Admin {
        return Err(ApiError::Forbidden {
            code: codes::ADMIN_REQUIRED,
            message: "Administrator privileges are required".to_string(),
        }
        .into_response());
    }

    Ok(next.run(request).await)
}

fn current_account(request: &Request) -> Result<Account, Response> {
    request
        .extensions()
        .get::<CurrentAccount>()
        .map(|current| current.0.clone())
        .ok_or_else(|| {
            unauthorized(codes::NO_TOKEN, "Authentication token is missing")
        })
}

fn unauthorized(code: &'static str, message: &str) -> Response {
    ApiError::Unauthorized {
        code,
        message: message.to_string(),
    }
    .into_response()
}
