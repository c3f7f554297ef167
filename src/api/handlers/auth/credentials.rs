//! Local sign-up and password sign-in.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::{
    json_body,
    types::{MessageResponse, SignInRequest, SignUpRequest, TokenResponse},
    validation::{require_email, require_present, require_strong_password},
};
use crate::{
    api::handlers::ErrorBody, auth::AuthService, error::Result, users::normalize_email,
};

#[utoipa::path(
    post,
    path = "/v1/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = MessageResponse),
        (status = 400, description = "Invalid body, weak password or email already registered", body = ErrorBody),
        (status = 500, description = "Hashing, storage or email delivery failed", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sign_up(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<SignUpRequest>>,
) -> Result<impl IntoResponse> {
    let request = json_body(payload, "sign-up")?;
    let email = normalize_email(&request.email);
    require_email(&email)?;
    require_strong_password(&request.password)?;

    auth.sign_up(&email, request.username.trim(), &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Created".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 401, description = "Invalid credentials or email not verified", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sign_in(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<SignInRequest>>,
) -> Result<Json<TokenResponse>> {
    let request = json_body(payload, "sign-in")?;
    let email = normalize_email(&request.email);
    require_email(&email)?;
    require_present(&request.password, "password")?;

    let token = auth.sign_in(&email, &request.password).await?;
    Ok(Json(TokenResponse { token }))
}
