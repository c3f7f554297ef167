//! Password reset: request a token by email, then redeem it with a new password.

use axum::{extract::Extension, Json};
use std::sync::Arc;

use super::{
    json_body,
    types::{EmptyResponse, ResetPasswordRequest, SendPasswordResetRequest},
    validation::{require_email, require_present, require_strong_password},
};
use crate::{
    api::handlers::ErrorBody, auth::AuthService, error::Result, users::normalize_email,
};

#[utoipa::path(
    post,
    path = "/v1/auth/send-password-reset-email",
    request_body = SendPasswordResetRequest,
    responses(
        (status = 200, description = "Reset email sent", body = EmptyResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "No account with this email", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn send_password_reset_email(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<SendPasswordResetRequest>>,
) -> Result<Json<EmptyResponse>> {
    let request = json_body(payload, "send-password-reset-email")?;
    let email = normalize_email(&request.email);
    require_email(&email)?;

    auth.send_password_reset_token(&email).await?;
    Ok(Json(EmptyResponse::default()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = EmptyResponse),
        (status = 400, description = "Invalid body, weak password, wrong token purpose or expired token", body = ErrorBody),
        (status = 404, description = "Unknown token or account", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Json<EmptyResponse>> {
    let request = json_body(payload, "reset-password")?;
    let token = require_present(&request.token, "token")?;
    require_strong_password(&request.password)?;

    auth.reset_password(token, &request.password).await?;
    Ok(Json(EmptyResponse::default()))
}
