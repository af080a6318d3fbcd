use crate::components::calendar::actor::{CalendarActor, CalendarActorHandle};
use crate::components::calendar::models::CalendarEvent;
use crate::components::calendar::token::TokenStore;
use crate::components::calendar::CalendarApi;
use crate::config::Config;
use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the calendar actor
#[derive(Clone)]
pub struct CalendarHandle {
    actor_handle: CalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarHandle {
    /// Create a new CalendarHandle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>, token_store: Arc<TokenStore>) -> Self {
        // Create the actor and get its handle
        let (mut actor, handle) = CalendarActor::new(config, token_store);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl CalendarApi for CalendarHandle {
    async fn list_events(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>> {
        self.actor_handle.list_events(range_start, range_end).await
    }

    async fn create_event(&self, event: CalendarEvent) -> SyncResult<String> {
        self.actor_handle.create_event(event).await
    }

    async fn update_event(&self, event_id: &str, event: CalendarEvent) -> SyncResult<()> {
        self.actor_handle
            .update_event(event_id.to_string(), event)
            .await
    }

    async fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        self.actor_handle.delete_event(event_id.to_string()).await
    }

    async fn check_connection(&self) -> SyncResult<bool> {
        self.actor_handle.check_connection().await
    }
}
