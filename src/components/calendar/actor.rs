use crate::components::calendar::models::{CalendarEvent, EventsListResponse};
use crate::components::calendar::token::TokenStore;
use crate::config::Config;
use crate::error::{operation_error, Error, SyncResult};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// The calendar actor that processes messages
pub struct CalendarActor {
    config: Arc<RwLock<Config>>,
    token_store: Arc<TokenStore>,
    client: Client,
    command_rx: mpsc::Receiver<CalendarCommand>,
}

/// Commands that can be sent to the calendar actor
pub enum CalendarCommand {
    ListEvents(
        DateTime<Utc>,
        DateTime<Utc>,
        mpsc::Sender<SyncResult<Vec<CalendarEvent>>>,
    ),
    CreateEvent(CalendarEvent, mpsc::Sender<SyncResult<String>>),
    UpdateEvent(String, CalendarEvent, mpsc::Sender<SyncResult<()>>),
    DeleteEvent(String, mpsc::Sender<SyncResult<()>>),
    CheckConnection(mpsc::Sender<SyncResult<bool>>),
    Shutdown,
}

/// Handle for communicating with the calendar actor
#[derive(Clone)]
pub struct CalendarActorHandle {
    command_tx: mpsc::Sender<CalendarCommand>,
}

impl CalendarActorHandle {
    async fn request<T>(
        &self,
        make_command: impl FnOnce(mpsc::Sender<SyncResult<T>>) -> CalendarCommand,
    ) -> SyncResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(make_command(response_tx))
            .await
            .map_err(|e| operation_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| operation_error("Response channel closed"))?
    }

    /// List events overlapping the given range
    pub async fn list_events(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>> {
        self.request(|tx| CalendarCommand::ListEvents(range_start, range_end, tx))
            .await
    }

    /// Create an event, returning the provider-assigned id
    pub async fn create_event(&self, event: CalendarEvent) -> SyncResult<String> {
        self.request(|tx| CalendarCommand::CreateEvent(event, tx))
            .await
    }

    /// Replace an event body wholesale
    pub async fn update_event(&self, event_id: String, event: CalendarEvent) -> SyncResult<()> {
        self.request(|tx| CalendarCommand::UpdateEvent(event_id, event, tx))
            .await
    }

    /// Delete an event; already-gone events count as deleted
    pub async fn delete_event(&self, event_id: String) -> SyncResult<()> {
        self.request(|tx| CalendarCommand::DeleteEvent(event_id, tx))
            .await
    }

    /// Probe whether the calendar is usable right now
    pub async fn check_connection(&self) -> SyncResult<bool> {
        self.request(CalendarCommand::CheckConnection).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(CalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl CalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: Arc<RwLock<Config>>,
        token_store: Arc<TokenStore>,
    ) -> (Self, CalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            token_store,
            client: Client::new(),
            command_rx,
        };

        let handle = CalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarCommand::ListEvents(range_start, range_end, response_tx) => {
                    let result = self.list_events(range_start, range_end).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::CreateEvent(event, response_tx) => {
                    let result = self.create_event(event).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::UpdateEvent(event_id, event, response_tx) => {
                    let result = self.update_event(&event_id, event).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::DeleteEvent(event_id, response_tx) => {
                    let result = self.delete_event(&event_id).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::CheckConnection(response_tx) => {
                    let result = self.check_connection().await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::Shutdown => {
                    info!("Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar actor shut down");
    }

    /// Build the events collection URL, or a single event's URL
    async fn events_url(&self, event_id: Option<&str>) -> SyncResult<Url> {
        let (base_url, calendar_id) = {
            let config_read = self.config.read().await;
            (
                config_read.calendar_api_base_url.clone(),
                config_read.google_calendar_id.clone(),
            )
        };

        let url_str = match event_id {
            Some(id) => format!("{}/calendars/{}/events/{}", base_url, calendar_id, id),
            None => format!("{}/calendars/{}/events", base_url, calendar_id),
        };

        Url::parse(&url_str)
            .map_err(|e| operation_error(&format!("Failed to parse URL: {}", e)))
    }

    /// Turn a non-success response into the right error.
    ///
    /// A 401 means the provider no longer honors the token; the stored
    /// record is cleared so every later call fails fast with
    /// `Unauthenticated` instead of hitting the network again.
    async fn classify_failure(&self, status: StatusCode, body: String, context: &str) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            warn!("Calendar provider rejected the access token; clearing it");
            if let Err(e) = self.token_store.clear().await {
                warn!("Failed to clear rejected token: {:?}", e);
            }
            return Error::AuthExpired;
        }

        operation_error(&format!("{}: HTTP {} - {}", context, status, body))
    }

    async fn error_body(response: reqwest::Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string())
    }

    /// List events overlapping `[range_start, range_end)`, recurring
    /// events expanded, provider-ordered by start, soft-deleted entries
    /// dropped
    async fn list_events(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>> {
        let access_token = self.token_store.access_token().await?;

        let mut url = self.events_url(None).await?;
        url.query_pairs_mut()
            .append_pair("timeMin", &range_start.to_rfc3339())
            .append_pair("timeMax", &range_end.to_rfc3339())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(self
                .classify_failure(status, body, "Failed to list events")
                .await);
        }

        let parsed: EventsListResponse = response
            .json()
            .await
            .map_err(|e| operation_error(&format!("Failed to parse events response: {}", e)))?;

        Ok(parsed
            .items
            .into_iter()
            .filter(|event| !event.is_cancelled())
            .collect())
    }

    /// Create an event and return the provider-assigned id
    async fn create_event(&self, event: CalendarEvent) -> SyncResult<String> {
        let access_token = self.token_store.access_token().await?;
        let url = self.events_url(None).await?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(self
                .classify_failure(status, body, "Failed to create event")
                .await);
        }

        let created: CalendarEvent = response
            .json()
            .await
            .map_err(|e| operation_error(&format!("Failed to parse create response: {}", e)))?;

        created
            .id
            .ok_or_else(|| operation_error("Create response carried no event id"))
    }

    /// Replace an event body wholesale (PUT, not PATCH)
    async fn update_event(&self, event_id: &str, event: CalendarEvent) -> SyncResult<()> {
        let access_token = self.token_store.access_token().await?;
        let url = self.events_url(Some(event_id)).await?;

        let response = self
            .client
            .put(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(self
                .classify_failure(status, body, "Failed to update event")
                .await);
        }

        Ok(())
    }

    /// Delete an event. The caller may race a provider-side deletion, so
    /// an already-gone event is success, not failure.
    async fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        let access_token = self.token_store.access_token().await?;
        let url = self.events_url(Some(event_id)).await?;

        let response = self
            .client
            .delete(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!("Event {} already gone on the provider side", event_id);
            return Ok(());
        }
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(self
                .classify_failure(status, body, "Failed to delete event")
                .await);
        }

        Ok(())
    }

    /// One cheap authenticated call; usable token plus a success status
    /// counts as connected
    async fn check_connection(&self) -> SyncResult<bool> {
        let access_token = match self.token_store.access_token().await {
            Ok(token) => token,
            Err(Error::Unauthenticated) | Err(Error::AuthExpired) => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut url = self.events_url(None).await?;
        url.query_pairs_mut()
            .append_pair("maxResults", "1")
            .append_pair("timeMin", &Utc::now().to_rfc3339());

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Connection probe got a 401; clearing the stored token");
            if let Err(e) = self.token_store.clear().await {
                warn!("Failed to clear rejected token: {:?}", e);
            }
            return Ok(false);
        }

        Ok(status.is_success())
    }
}
