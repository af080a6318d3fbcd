use crate::components::calendar::token::TokenRecord;
use crate::components::storage::actor::keys;
use crate::components::storage::TokenStorage;
use crate::error::{storage_error, SyncResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory token storage for hosts running without Redis and for tests.
///
/// Uses the same key layout as the Redis actor so the two are
/// interchangeable behind [`TokenStorage`].
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|_| storage_error("Storage lock poisoned"))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> SyncResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| storage_error("Storage lock poisoned"))?;
        data.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> SyncResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| storage_error("Storage lock poisoned"))?;
        data.remove(key);
        Ok(())
    }
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn load_token(&self) -> SyncResult<Option<TokenRecord>> {
        match self.get(keys::TOKEN)? {
            Some(json) => {
                let record: TokenRecord = serde_json::from_str(&json)
                    .map_err(|e| storage_error(&format!("Failed to deserialize token: {}", e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn store_token(&self, record: &TokenRecord) -> SyncResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| storage_error(&format!("Failed to serialize token: {}", e)))?;
        self.set(keys::TOKEN, json)
    }

    async fn clear_token(&self) -> SyncResult<()> {
        self.delete(keys::TOKEN)
    }

    async fn load_auth_state(&self) -> SyncResult<Option<String>> {
        self.get(keys::AUTH_STATE)
    }

    async fn store_auth_state(&self, state: &str) -> SyncResult<()> {
        self.set(keys::AUTH_STATE, state.to_string())
    }

    async fn clear_auth_state(&self) -> SyncResult<()> {
        self.delete(keys::AUTH_STATE)
    }
}
