//! Account administration, mounted behind a mandatory gate restricted to admins.

use axum::{
    extract::{Extension, Path},
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    auth::{types::AccountResponse, CurrentAccount},
    ErrorBody,
};
use crate::{
    auth::AuthService,
    error::{Error, Result},
};

/// Parsed here so a malformed id gets the JSON error body.
fn account_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|err| {
        warn!("Invalid account id {raw:?}: {err}");
        Error::bad_request("Invalid account id")
    })
}

#[utoipa::path(
    get,
    path = "/v1/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 400, description = "Malformed account id", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn get_user(
    auth: Extension<Arc<AuthService>>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>> {
    let account = auth.account(account_id(&id)?).await?;
    Ok(Json(account.into()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/{id}/block",
    params(
        ("id" = Uuid, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account blocked", body = AccountResponse),
        (status = 400, description = "Malformed id or account not active", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn block_user(
    auth: Extension<Arc<AuthService>>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>> {
    let account = auth.block_account(account_id(&id)?).await?;
    info!(admin_id = %admin.id, user_id = %account.id, "Admin blocked account");
    Ok(Json(account.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_parses_uuids_only() {
        let id = Uuid::new_v4();
        assert_eq!(account_id(&id.to_string()), Ok(id));
        assert_eq!(
            account_id("not-a-uuid"),
            Err(Error::bad_request("Invalid account id"))
        );
    }
}
