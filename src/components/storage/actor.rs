use crate::components::calendar::token::TokenRecord;
use crate::components::storage::TokenStorage;
use crate::config::Config;
use crate::error::{storage_error, SyncResult};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client as RedisClient};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

// Redis key constants
pub mod keys {
    pub const TOKEN: &str = "surgisync:token";
    pub const AUTH_STATE: &str = "surgisync:auth_state";
}

/// The storage actor that processes messages
pub struct StorageActor {
    config: Arc<RwLock<Config>>,
    command_rx: mpsc::Receiver<StorageCommand>,
}

/// Commands that can be sent to the storage actor
pub enum StorageCommand {
    LoadToken(mpsc::Sender<SyncResult<Option<TokenRecord>>>),
    StoreToken(TokenRecord, mpsc::Sender<SyncResult<()>>),
    ClearToken(mpsc::Sender<SyncResult<()>>),
    LoadAuthState(mpsc::Sender<SyncResult<Option<String>>>),
    StoreAuthState(String, mpsc::Sender<SyncResult<()>>),
    ClearAuthState(mpsc::Sender<SyncResult<()>>),
    Shutdown,
}

/// Handle for communicating with the storage actor
#[derive(Clone)]
pub struct StorageActorHandle {
    command_tx: mpsc::Sender<StorageCommand>,
}

impl StorageActorHandle {
    /// Create a new empty handle for initialization purposes
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        make_command: impl FnOnce(mpsc::Sender<SyncResult<T>>) -> StorageCommand,
    ) -> SyncResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(make_command(response_tx))
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| storage_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(StorageCommand::Shutdown).await;
        Ok(())
    }
}

#[async_trait]
impl TokenStorage for StorageActorHandle {
    async fn load_token(&self) -> SyncResult<Option<TokenRecord>> {
        self.request(StorageCommand::LoadToken).await
    }

    async fn store_token(&self, record: &TokenRecord) -> SyncResult<()> {
        let record = record.clone();
        self.request(|tx| StorageCommand::StoreToken(record, tx))
            .await
    }

    async fn clear_token(&self) -> SyncResult<()> {
        self.request(StorageCommand::ClearToken).await
    }

    async fn load_auth_state(&self) -> SyncResult<Option<String>> {
        self.request(StorageCommand::LoadAuthState).await
    }

    async fn store_auth_state(&self, state: &str) -> SyncResult<()> {
        let state = state.to_string();
        self.request(|tx| StorageCommand::StoreAuthState(state, tx))
            .await
    }

    async fn clear_auth_state(&self) -> SyncResult<()> {
        self.request(StorageCommand::ClearAuthState).await
    }
}

impl StorageActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, StorageActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self { config, command_rx };
        let handle = StorageActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Storage actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                StorageCommand::LoadToken(response_tx) => {
                    let result = self.load_token_from_redis().await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::StoreToken(record, response_tx) => {
                    let result = self.store_token_to_redis(record).await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::ClearToken(response_tx) => {
                    let result = self.delete_key(keys::TOKEN).await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::LoadAuthState(response_tx) => {
                    let result = self.load_auth_state_from_redis().await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::StoreAuthState(state, response_tx) => {
                    let result = self.store_auth_state_to_redis(state).await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::ClearAuthState(response_tx) => {
                    let result = self.delete_key(keys::AUTH_STATE).await;
                    let _ = response_tx.send(result).await;
                }
                StorageCommand::Shutdown => {
                    info!("Storage actor shutting down");
                    break;
                }
            }
        }

        info!("Storage actor shut down");
    }

    /// Get a redis connection
    async fn get_redis_connection(&self) -> SyncResult<MultiplexedConnection> {
        // Get Redis URL from config
        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let redis = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;

        redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))
    }

    /// Load the token record from Redis
    async fn load_token_from_redis(&self) -> SyncResult<Option<TokenRecord>> {
        let mut redis_conn = self.get_redis_connection().await?;

        let exists: bool = redis_conn
            .exists(keys::TOKEN)
            .await
            .map_err(|e| storage_error(&format!("Redis error: {}", e)))?;

        if !exists {
            return Ok(None);
        }

        let record_json: String = redis_conn
            .get(keys::TOKEN)
            .await
            .map_err(|e| storage_error(&format!("Failed to read token from Redis: {}", e)))?;

        let record: TokenRecord = serde_json::from_str(&record_json)
            .map_err(|e| storage_error(&format!("Failed to deserialize token: {}", e)))?;

        Ok(Some(record))
    }

    /// Store the token record to Redis
    async fn store_token_to_redis(&self, record: TokenRecord) -> SyncResult<()> {
        let mut redis_conn = self.get_redis_connection().await?;

        let record_json = serde_json::to_string(&record)
            .map_err(|e| storage_error(&format!("Failed to serialize token: {}", e)))?;

        () = redis_conn
            .set(keys::TOKEN, record_json)
            .await
            .map_err(|e| storage_error(&format!("Failed to save token to Redis: {}", e)))?;

        Ok(())
    }

    /// Load the pending auth state from Redis
    async fn load_auth_state_from_redis(&self) -> SyncResult<Option<String>> {
        let mut redis_conn = self.get_redis_connection().await?;

        let exists: bool = redis_conn
            .exists(keys::AUTH_STATE)
            .await
            .map_err(|e| storage_error(&format!("Redis error: {}", e)))?;

        if !exists {
            return Ok(None);
        }

        let state: String = redis_conn
            .get(keys::AUTH_STATE)
            .await
            .map_err(|e| storage_error(&format!("Failed to read auth state from Redis: {}", e)))?;

        Ok(Some(state))
    }

    /// Store the pending auth state to Redis
    async fn store_auth_state_to_redis(&self, state: String) -> SyncResult<()> {
        let mut redis_conn = self.get_redis_connection().await?;

        () = redis_conn
            .set(keys::AUTH_STATE, state)
            .await
            .map_err(|e| storage_error(&format!("Failed to save auth state to Redis: {}", e)))?;

        Ok(())
    }

    /// Delete a key from Redis
    async fn delete_key(&self, key: &str) -> SyncResult<()> {
        let mut redis_conn = self.get_redis_connection().await?;

        () = redis_conn
            .del(key)
            .await
            .map_err(|e| storage_error(&format!("Failed to delete {} from Redis: {}", key, e)))?;

        Ok(())
    }
}
