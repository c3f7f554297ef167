//! Email verification endpoint.

use axum::{extract::Extension, Json};
use std::sync::Arc;

use super::{
    json_body,
    types::{EmptyResponse, VerifyEmailRequest},
    validation::require_present,
};
use crate::{api::handlers::ErrorBody, auth::AuthService, error::Result};

/// Activate the account owning the token and revoke all of its tokens.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = EmptyResponse),
        (status = 400, description = "Invalid body, wrong token purpose or expired token", body = ErrorBody),
        (status = 404, description = "Unknown or already used token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<Json<EmptyResponse>> {
    let request = json_body(payload, "verify-email")?;
    let token = require_present(&request.token, "token")?;

    auth.verify_email(token).await?;
    Ok(Json(EmptyResponse::default()))
}
