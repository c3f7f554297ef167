//! SSO: redirect to the provider, then trade the returned code for a bearer token.

use axum::{
    extract::{Extension, Path},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::{
    json_body,
    types::{SsoCallbackRequest, TokenResponse},
    validation::require_present,
};
use crate::{api::handlers::ErrorBody, auth::AuthService, error::Result};

#[utoipa::path(
    get,
    path = "/v1/auth/sso/{provider}",
    params(
        ("provider" = String, Path, description = "Provider name, e.g. `github`")
    ),
    responses(
        (status = 302, description = "Redirect to the provider's authorization page"),
        (status = 400, description = "Unsupported SSO provider", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sso_sign_in(
    auth: Extension<Arc<AuthService>>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse> {
    let url = auth.sso_sign_in(&provider)?;
    Ok((StatusCode::FOUND, [(LOCATION, url)]))
}

#[utoipa::path(
    post,
    path = "/v1/auth/sso/{provider}/sign-in",
    params(
        ("provider" = String, Path, description = "Provider name, e.g. `github`")
    ),
    request_body = SsoCallbackRequest,
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 400, description = "Unsupported provider, invalid body or rejected code", body = ErrorBody),
        (status = 404, description = "Provider returned no verified email", body = ErrorBody),
        (status = 500, description = "Provider answer could not be decoded", body = ErrorBody),
        (status = 502, description = "Provider unreachable", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sso_callback(
    auth: Extension<Arc<AuthService>>,
    Path(provider): Path<String>,
    payload: Option<Json<SsoCallbackRequest>>,
) -> Result<Json<TokenResponse>> {
    let request = json_body(payload, "sso-callback")?;
    let code = require_present(&request.code, "code")?;

    let token = auth.sso_callback(&provider, code).await?;
    Ok(Json(TokenResponse { token }))
}
