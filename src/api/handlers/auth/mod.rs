//! Auth endpoints.
//!
//! Flow Overview:
//! 1) Local sign-up stores a `Pending` account and mails a verification link.
//! 2) Verify-email consumes the link token and activates the account.
//! 3) Sign-in (password or SSO) returns an HS256 bearer token.
//! 4) Password reset mails a single-purpose token, then swaps the hash.
//!
//! Bodies are validated here; the orchestrator only sees well-formed input.
//! Gated routes rely on [`gate::enforce`] having attached a [`gate::CurrentAccount`].

pub mod credentials;
pub mod gate;
pub mod password;
pub mod session;
pub mod sso;
pub mod types;
pub mod verification;

pub(crate) mod validation;


use axum::Json;
use tracing::warn;

use crate::error::{Error, Result};

pub use gate::{CurrentAccount, Gate};

/// Unwrap an optional JSON body; a missing or unparseable body is `BadRequest`.
pub(crate) fn json_body<T>(payload: Option<Json<T>>, route: &str) -> Result<T> {
    match payload {
        Some(Json(body)) => Ok(body),
        None => {
            warn!(route, "Invalid request body");
            Err(Error::bad_request("Invalid request body"))
        }
    }
}
