use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Account, AccountUpsert, CreateOutcome, NewAccount, Role, Status, UserDirectory};

/// In-memory directory with the same uniqueness and upsert rules as Postgres.
#[derive(Default)]
pub(crate) struct MemoryUserDirectory {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryUserDirectory {
    pub(crate) async fn insert(&self, account: Account) {
        self.accounts.lock().await.insert(account.id, account);
    }

    pub(crate) async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }
}

fn keep_unless_empty(stored: &mut String, incoming: String) {
    if !incoming.is_empty() {
        *stored = incoming;
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.values().find(|account| account.email == email).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|existing| existing.email == account.email) {
            return Ok(CreateOutcome::Conflict);
        }
        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            username: account.username,
            picture_url: String::new(),
            role: account.role,
            status: account.status,
            provider: String::new(),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn update(&self, account: &Account) -> Result<Option<Account>> {
        let mut accounts = self.accounts.lock().await;
        let Some(stored) = accounts.get_mut(&account.id) else {
            return Ok(None);
        };
        stored.password_hash.clone_from(&account.password_hash);
        stored.username.clone_from(&account.username);
        stored.picture_url.clone_from(&account.picture_url);
        stored.role = account.role;
        stored.status = account.status;
        stored.provider.clone_from(&account.provider);
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn upsert_by_email(&self, upsert: AccountUpsert) -> Result<Account> {
        let mut accounts = self.accounts.lock().await;
        let now = Utc::now();
        if let Some(stored) = accounts
            .values_mut()
            .find(|account| account.email == upsert.email)
        {
            keep_unless_empty(&mut stored.username, upsert.username);
            keep_unless_empty(&mut stored.picture_url, upsert.picture_url);
            keep_unless_empty(&mut stored.provider, upsert.provider);
            if stored.status != Status::Blocked {
                stored.status = upsert.status;
            }
            stored.updated_at = now;
            return Ok(stored.clone());
        }
        let created = Account {
            id: Uuid::new_v4(),
            email: upsert.email,
            password_hash: String::new(),
            username: upsert.username,
            picture_url: upsert.picture_url,
            role: Role::User,
            status: upsert.status,
            provider: upsert.provider,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(email: &str, username: &str) -> AccountUpsert {
        AccountUpsert {
            email: email.to_string(),
            username: username.to_string(),
            picture_url: String::new(),
            provider: "github".to_string(),
            status: Status::Active,
        }
    }

    #[tokio::test]
    async fn create_rejects_a_second_account_for_the_email() -> Result<()> {
        let directory = MemoryUserDirectory::default();
        let new = NewAccount {
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            username: "a".to_string(),
            role: Role::User,
            status: Status::Pending,
        };
        assert!(matches!(directory.create(new.clone()).await?, CreateOutcome::Created(_)));
        assert!(matches!(directory.create(new).await?, CreateOutcome::Conflict));
        assert_eq!(directory.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_keeps_stored_fields_when_incoming_is_empty() -> Result<()> {
        let directory = MemoryUserDirectory::default();
        let first = directory.upsert_by_email(upsert("a@example.com", "octo")).await?;
        let second = directory.upsert_by_email(upsert("a@example.com", "")).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.username, "octo");
        assert_eq!(directory.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_leaves_a_blocked_account_blocked() -> Result<()> {
        let directory = MemoryUserDirectory::default();
        let mut account = directory.upsert_by_email(upsert("a@example.com", "octo")).await?;
        account.status = Status::Blocked;
        directory.update(&account).await?;

        let after = directory.upsert_by_email(upsert("a@example.com", "octo2")).await?;
        assert_eq!(after.status, Status::Blocked);
        assert_eq!(after.username, "octo2");
        Ok(())
    }
}
