//! Request gate: resolves the bearer token into the acting account.
//!
//! `Optional` routes let anonymous callers through and only attach an account
//! when a valid token is present. `Mandatory` routes reject the request unless
//! a valid token resolves to an active account with an allowed role.

use axum::{
    extract::{Extension, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    auth::AuthService,
    error::{Error, Result},
    users::{Account, Role},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateMode {
    Optional,
    Mandatory,
}

#[derive(Clone, Debug)]
pub struct Gate {
    mode: GateMode,
    roles: Vec<Role>,
}

/// Account attached to the request by [`enforce`].
#[derive(Clone, Debug)]
pub struct CurrentAccount(pub Account);

impl Gate {
    #[must_use]
    pub fn optional() -> Self {
        Self {
            mode: GateMode::Optional,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn mandatory() -> Self {
        Self {
            mode: GateMode::Mandatory,
            roles: Vec::new(),
        }
    }

    /// Restrict to the given roles. An empty list admits every role.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    #[must_use]
    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Decide whether the request may proceed and as whom.
    ///
    /// `Ok(None)` means an anonymous caller on an optional route.
    ///
    /// # Errors
    /// `Unauthorized` for a missing (mandatory only) or invalid token, an
    /// unknown account or an account that is not active; `Forbidden` when the
    /// role is not allowed.
    pub async fn admit(&self, auth: &AuthService, headers: &HeaderMap) -> Result<Option<Account>> {
        let Some(token) = bearer_token(headers) else {
            return match self.mode {
                GateMode::Optional => Ok(None),
                GateMode::Mandatory => Err(Error::unauthorized("Missing authentication token")),
            };
        };

        let claims = match auth.verify_bearer(token) {
            Ok(claims) => claims,
            Err(err) => {
                return match self.mode {
                    GateMode::Optional => {
                        debug!("Ignoring invalid bearer token on optional route");
                        Ok(None)
                    }
                    GateMode::Mandatory => Err(err),
                };
            }
        };

        let account = auth.bearer_account(&claims).await?;

        if !account.is_active() {
            warn!(user_id = %account.id, status = %account.status, "Inactive account presented a token");
            return Err(Error::unauthorized("User is not active"));
        }

        if !self.roles.is_empty() && !self.roles.contains(&account.role) {
            warn!(user_id = %account.id, role = %account.role, "Role not allowed");
            return Err(Error::forbidden("Not enough permissions"));
        }

        Ok(Some(account))
    }
}

/// Token from `Authorization: Bearer <token>`; any other shape counts as absent.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware applying a [`Gate`]; install with `middleware::from_fn_with_state`.
pub async fn enforce(
    State(gate): State<Gate>,
    Extension(auth): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.admit(&auth, request.headers()).await {
        Ok(Some(account)) => {
            request.extensions_mut().insert(CurrentAccount(account));
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
