use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::AccountData;
use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::CurrentAccount;

pub async fn me(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<ApiSuccess<MeResponseData>, ApiError> {
    Ok(ApiSuccess::new(
        StatusCode::OK,
        MeResponseData {
            user: AccountData::from(&account),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeResponseData {
    pub user: AccountData,
}
