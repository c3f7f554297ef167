//! Single-purpose, time-limited verification tokens.
//!
//! The raw token only ever leaves the process inside an email link. The
//! repository stores its SHA-256 hash, so a leaked table cannot be replayed.

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::error;
use uuid::Uuid;

use crate::error::{Error, Result};

#[cfg(test)]
pub(crate) mod memory;
pub mod storage;

pub use storage::PgTokenRepository;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Purpose {
    EmailVerification,
    PasswordReset,
}

impl Purpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            other => Err(anyhow::anyhow!("unknown token purpose: {other}")),
        }
    }
}

/// Persisted form of a token; `token_hash` replaces the raw value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub purpose: Purpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Fails if `token_hash` is already present.
    async fn insert(&self, record: TokenRecord) -> anyhow::Result<()>;

    async fn find_by_hash(&self, token_hash: &[u8]) -> anyhow::Result<Option<TokenRecord>>;

    /// Remove every token of the user regardless of purpose.
    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationToken {
    pub token: String,
    pub user_id: Uuid,
    pub purpose: Purpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    /// A token is still good at the exact instant it expires.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

pub(crate) fn generate_token() -> anyhow::Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Issues, resolves and revokes verification tokens over a [`TokenRepository`].
#[derive(Clone)]
pub struct VerificationTokens {
    repository: Arc<dyn TokenRepository>,
    ttl: Duration,
}

impl VerificationTokens {
    #[must_use]
    pub fn new(repository: Arc<dyn TokenRepository>, ttl_minutes: u32) -> Self {
        Self {
            repository,
            ttl: Duration::minutes(i64::from(ttl_minutes)),
        }
    }

    /// # Errors
    /// `Internal` when entropy or the repository fails.
    pub async fn issue(&self, user_id: Uuid, purpose: Purpose) -> Result<VerificationToken> {
        self.issue_at(user_id, purpose, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        user_id: Uuid,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> Result<VerificationToken> {
        let token = generate_token().map_err(|err| {
            error!("Failed to generate verification token: {err:#}");
            Error::internal("Failed to save verification token")
        })?;
        let record = TokenRecord {
            token_hash: hash_token(&token),
            user_id,
            purpose,
            created_at: now,
            expires_at: now + self.ttl,
        };
        let issued = VerificationToken {
            token,
            user_id,
            purpose,
            created_at: record.created_at,
            expires_at: record.expires_at,
        };
        self.repository.insert(record).await.map_err(|err| {
            error!(%user_id, "Failed to save verification token: {err:#}");
            Error::internal("Failed to save verification token")
        })?;
        Ok(issued)
    }

    /// Exact-match lookup. Purpose and expiry are left to the caller.
    ///
    /// # Errors
    /// `NotFound` for unknown (or already consumed) tokens.
    pub async fn resolve(&self, token: &str) -> Result<VerificationToken> {
        let record = self
            .repository
            .find_by_hash(&hash_token(token))
            .await
            .map_err(|err| {
                error!("Failed to fetch verification token: {err:#}");
                Error::internal("Failed to fetch verification token")
            })?
            .ok_or_else(|| Error::not_found("Token not found"))?;
        Ok(VerificationToken {
            token: token.to_string(),
            user_id: record.user_id,
            purpose: record.purpose,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// # Errors
    /// `Internal` when the repository fails.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<()> {
        let removed = self
            .repository
            .delete_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, "Failed to delete verification tokens: {err:#}");
                Error::internal("Failed to delete user tokens")
            })?;
        tracing::debug!(%user_id, removed, "Revoked verification tokens");
        Ok(())
    }
}
