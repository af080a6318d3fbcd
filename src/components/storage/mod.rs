use crate::components::calendar::token::TokenRecord;
use crate::error::SyncResult;
use async_trait::async_trait;

pub mod actor;
pub mod memory;

pub use actor::{StorageActor, StorageActorHandle, StorageCommand};
pub use memory::MemoryStorage;

/// Persistence seam for the calendar connection state.
///
/// One token slot per installation: the record itself carries the owning
/// user, so storing a record for a different user overwrites the slot.
/// The auth state slot holds the CSRF state of the one outstanding
/// authorization request, if any.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Load the stored token record, if any
    async fn load_token(&self) -> SyncResult<Option<TokenRecord>>;

    /// Store a token record, replacing whatever the slot held
    async fn store_token(&self, record: &TokenRecord) -> SyncResult<()>;

    /// Remove the stored token record
    async fn clear_token(&self) -> SyncResult<()>;

    /// Load the pending authorization state, if any
    async fn load_auth_state(&self) -> SyncResult<Option<String>>;

    /// Store the pending authorization state
    async fn store_auth_state(&self, state: &str) -> SyncResult<()>;

    /// Remove the pending authorization state
    async fn clear_auth_state(&self) -> SyncResult<()>;
}
