use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{TokenRecord, TokenRepository};

#[derive(Default)]
pub(crate) struct MemoryTokenRepository {
    records: Mutex<HashMap<Vec<u8>, TokenRecord>>,
}

impl MemoryTokenRepository {
    pub(crate) async fn count_for_user(&self, user_id: Uuid) -> usize {
        let records = self.records.lock().await;
        records
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }

    /// True when a key equals `raw`, i.e. a raw token was stored unhashed.
    pub(crate) async fn contains_raw(&self, raw: &[u8]) -> bool {
        self.records.lock().await.contains_key(raw)
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.token_hash) {
            bail!("duplicate token hash");
        }
        records.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        Ok(self.records.lock().await.get(token_hash).cloned())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.user_id != user_id);
        Ok(u64::try_from(before - records.len())?)
    }
}
