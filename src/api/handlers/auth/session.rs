//! Endpoints describing the caller's own account.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{gate::CurrentAccount, types::AccountResponse};
use crate::api::handlers::ErrorBody;

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "The authenticated account", body = AccountResponse),
        (status = 401, description = "Missing, invalid or expired token, or inactive account", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(Extension(CurrentAccount(account)): Extension<CurrentAccount>) -> Json<AccountResponse> {
    Json(account.into())
}

/// Probe for an optional session: anonymous callers get 204.
#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Bearer token resolved to an account", body = AccountResponse),
        (status = 204, description = "No (valid) bearer token"),
        (status = 401, description = "Token names a missing or inactive account", body = ErrorBody)
    ),
    security((), ("bearer" = [])),
    tag = "auth"
)]
pub async fn session(current: Option<Extension<CurrentAccount>>) -> Response {
    match current {
        Some(Extension(CurrentAccount(account))) => {
            Json(AccountResponse::from(account)).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
