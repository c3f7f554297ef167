//! Postgres-backed verification token repository.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{TokenRecord, TokenRepository};

#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        let query = r"
            INSERT INTO verification_tokens
                (user_id, token_hash, purpose, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(record.user_id)
            .bind(&record.token_hash)
            .bind(record.purpose.as_str())
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert verification token")?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        let query = r"
            SELECT user_id, token_hash, purpose, created_at, expires_at
            FROM verification_tokens
            WHERE token_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup verification token")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let purpose: String = row.try_get("purpose")?;
        Ok(Some(TokenRecord {
            token_hash: row.try_get("token_hash")?,
            user_id: row.try_get("user_id")?,
            purpose: purpose.parse()?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM verification_tokens WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete verification tokens")?;
        Ok(result.rows_affected())
    }
}
