//! Account model and the user directory the auth core reads and writes.
//!
//! The directory is an interface: the server wires the Postgres implementation
//! in [`storage`], tests use an in-memory one.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod memory;
pub mod storage;

pub use storage::PgUserDirectory;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "User" => Ok(Self::User),
            "Admin" => Ok(Self::Admin),
            other => Err(anyhow!("unknown role: {other}")),
        }
    }
}

/// Account lifecycle.
///
/// `Pending -> Active` via email verification, `Active -> Blocked` by an
/// administrator. SSO sign-in always lands on `Active`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Status {
    #[default]
    Pending,
    Active,
    Blocked,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Blocked => "Blocked",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Active" => Ok(Self::Active),
            "Blocked" => Ok(Self::Blocked),
            other => Err(anyhow!("unknown account status: {other}")),
        }
    }
}

/// Canonical form used for lookups and the uniqueness constraint.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// Empty for accounts that only ever signed in through SSO.
    pub password_hash: String,
    pub username: String,
    pub picture_url: String,
    pub role: Role,
    pub status: Status,
    /// Identity provider name, empty for local accounts.
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// Fields supplied by a local sign-up.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub role: Role,
    pub status: Status,
}

/// Create-or-update keyed by email, produced by an SSO login.
///
/// Empty `username`, `picture_url` or `provider` keep the stored value when the
/// account already exists. Password hash and role are never touched.
#[derive(Clone, Debug)]
pub struct AccountUpsert {
    pub email: String,
    pub username: String,
    pub picture_url: String,
    pub provider: String,
    pub status: Status,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    /// Another account already owns the email.
    Conflict,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Exact match on the (already normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome>;

    /// Persist the mutable fields of `account`; `None` when the row is gone.
    async fn update(&self, account: &Account) -> Result<Option<Account>>;

    async fn upsert_by_email(&self, upsert: AccountUpsert) -> Result<Account>;
}
