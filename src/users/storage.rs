//! Postgres-backed user directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{Account, AccountUpsert, CreateOutcome, NewAccount, UserDirectory};

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SQLSTATE 23505, raised when the email unique index rejects an insert.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        username: row.try_get("username")?,
        picture_url: row.try_get("picture_url")?,
        role: role.parse()?,
        status: status.parse()?,
        provider: row.try_get("provider")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = r"
            SELECT id, email, password_hash, username, picture_url, role, status,
                   provider, created_at, updated_at
            FROM users
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = r"
            SELECT id, email, password_hash, username, picture_url, role, status,
                   provider, created_at, updated_at
            FROM users
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO users
                (email, password_hash, username, role, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, username, picture_url, role, status,
                      provider, created_at, updated_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.username)
            .bind(account.role.as_str())
            .bind(account.status.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(account_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update(&self, account: &Account) -> Result<Option<Account>> {
        let query = r"
            UPDATE users
            SET password_hash = $2,
                username = $3,
                picture_url = $4,
                role = $5,
                status = $6,
                provider = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, username, picture_url, role, status,
                      provider, created_at, updated_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account.id)
            .bind(&account.password_hash)
            .bind(&account.username)
            .bind(&account.picture_url)
            .bind(account.role.as_str())
            .bind(account.status.as_str())
            .bind(&account.provider)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn upsert_by_email(&self, upsert: AccountUpsert) -> Result<Account> {
        // Empty incoming profile fields keep what is stored; Blocked is sticky.
        let query = r"
            INSERT INTO users
                (email, username, picture_url, provider, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET username = COALESCE(NULLIF(EXCLUDED.username, ''), users.username),
                picture_url = COALESCE(NULLIF(EXCLUDED.picture_url, ''), users.picture_url),
                provider = COALESCE(NULLIF(EXCLUDED.provider, ''), users.provider),
                status = CASE WHEN users.status = 'Blocked' THEN users.status
                              ELSE EXCLUDED.status END,
                updated_at = NOW()
            RETURNING id, email, password_hash, username, picture_url, role, status,
                      provider, created_at, updated_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&upsert.email)
            .bind(&upsert.username)
            .bind(&upsert.picture_url)
            .bind(&upsert.provider)
            .bind(upsert.status.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert user")?;

        account_from_row(&row)
    }
}
