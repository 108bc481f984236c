use axum::http::StatusCode;
use axum::Extension;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::account::access;
use crate::inbound::http::middleware::CurrentAccount;

/// Report the caller's subscription and trial standing.
///
/// Everything is computed from the account row at request time, so a
/// subscription granted or revoked elsewhere is reflected immediately.
pub async fn subscription(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<ApiSuccess<SubscriptionResponseData>, ApiError> {
    let now = Utc::now();

    Ok(ApiSuccess::new(
        StatusCode::OK,
        SubscriptionResponseData {
            has_access: access::has_access(&account, now),
            is_subscribed: account.is_subscribed,
            trial_active: access::has_active_trial(&account, now),
            trial_days_left: access::trial_days_left(&account, now),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionResponseData {
    has_access: bool,
    is_subscribed: bool,
    trial_active: bool,
    trial_days_left: i64,
}
