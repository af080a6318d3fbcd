mod actor;
pub mod auth;
mod handle;
pub mod models;
pub mod monitor;
pub mod time;
pub mod token;

pub use auth::{AuthOutcome, AuthRequest, AuthorizationFlow};
pub use handle::CalendarHandle;
pub use models::CalendarEvent;

use crate::components::calendar::monitor::start_monitor;
use crate::components::calendar::token::TokenStore;
use crate::components::storage::TokenStorage;
use crate::components::SessionContext;
use crate::config::Config;
use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Calendar operations the rest of the subsystem programs against.
/// `CalendarHandle` is the production implementation; tests substitute
/// their own.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Events overlapping `[range_start, range_end)`, expanded and
    /// ordered by start, without soft-deleted entries
    async fn list_events(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>>;

    /// Create an event, returning the provider-assigned id
    async fn create_event(&self, event: CalendarEvent) -> SyncResult<String>;

    /// Replace an event body wholesale
    async fn update_event(&self, event_id: &str, event: CalendarEvent) -> SyncResult<()>;

    /// Delete an event; an already-gone id still succeeds
    async fn delete_event(&self, event_id: &str) -> SyncResult<()>;

    /// Whether the calendar is usable right now
    async fn check_connection(&self) -> SyncResult<bool>;
}

/// Calendar synchronization component
#[derive(Default)]
pub struct CalendarSync {
    handle: RwLock<Option<CalendarHandle>>,
}

impl CalendarSync {
    /// Create a new calendar sync component
    pub fn new() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<CalendarHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for CalendarSync {
    fn name(&self) -> &'static str {
        "calendar_sync"
    }

    async fn init(
        &self,
        session: &SessionContext,
        config: Arc<RwLock<Config>>,
        storage: Arc<dyn TokenStorage>,
    ) -> SyncResult<()> {
        // The token store binds every calendar call to the session user
        let token_store = Arc::new(TokenStore::new(session.user.clone(), storage));

        // Create a new handle if one doesn't exist
        let mut handle_lock = self.handle.write().await;
        if handle_lock.is_none() {
            *handle_lock = Some(CalendarHandle::new(config.clone(), token_store));
        }

        let handle = handle_lock.as_ref().unwrap().clone();

        // Start the connection monitor
        start_monitor(session, config, Arc::new(handle)).await;

        Ok(())
    }

    async fn shutdown(&self) -> SyncResult<()> {
        // Shutdown the handle if it exists
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
