use crate::components::calendar::token::{TokenRecord, UserId};
use crate::components::storage::TokenStorage;
use crate::config::Config;
use crate::error::{operation_error, Error, SyncResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// Authorization request handed back to the caller, which performs the
/// actual browser navigation
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub authorize_url: String,
    pub state: String,
}

/// How a completed authorization callback resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Token stored; calendar calls can proceed
    Connected,
    /// The user declined on the consent screen
    Denied,
}

/// Implicit-grant flow against the provider's authorization endpoint.
///
/// The grant returns the access token in the redirect URL fragment, so
/// there is no refresh token and no client secret anywhere in this
/// subsystem; an expired token always means sending the user back
/// through the consent screen.
pub struct AuthorizationFlow {
    user: UserId,
    config: Arc<RwLock<Config>>,
    storage: Arc<dyn TokenStorage>,
}

impl AuthorizationFlow {
    pub fn new(user: UserId, config: Arc<RwLock<Config>>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            user,
            config,
            storage,
        }
    }

    /// Build the consent URL and persist the CSRF state the callback
    /// must echo. A repeated initiate replaces the pending state, so
    /// only the latest request can complete.
    pub async fn initiate(&self) -> SyncResult<AuthRequest> {
        let (auth_base, client_id, scope, redirect_uri) = {
            let config = self.config.read().await;
            (
                config.oauth_auth_base_url.clone(),
                config.google_client_id.clone(),
                config.oauth_scope.clone(),
                config.oauth_redirect_uri(),
            )
        };

        let state = Uuid::new_v4().to_string();
        self.storage.store_auth_state(&state).await?;

        let mut url = Url::parse(&auth_base)
            .map_err(|e| operation_error(&format!("Invalid authorization base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("scope", &scope)
            .append_pair("state", &state)
            .append_pair("prompt", "consent");

        Ok(AuthRequest {
            authorize_url: url.into(),
            state,
        })
    }

    /// Resolve the form-encoded fragment the provider redirected back
    /// with. Completing consumes the pending state, so a replayed
    /// fragment fails the state check.
    pub async fn complete_from_callback(&self, fragment: &str) -> SyncResult<AuthOutcome> {
        let params: HashMap<String, String> = url::form_urlencoded::parse(fragment.as_bytes())
            .into_owned()
            .collect();

        // A declined consent screen is a normal outcome, not an error
        if let Some(error) = params.get("error") {
            info!("Calendar authorization declined: {}", error);
            self.storage.clear_auth_state().await?;
            return Ok(AuthOutcome::Denied);
        }

        let expected = self.storage.load_auth_state().await?;
        match (expected.as_deref(), params.get("state").map(String::as_str)) {
            (Some(expected), Some(presented)) if presented == expected => {}
            _ => {
                warn!("Authorization callback state mismatch; dropping the response");
                self.storage.clear_auth_state().await?;
                return Err(Error::CsrfStateMismatch);
            }
        }

        let access_token = match params.get("access_token") {
            Some(token) => token.clone(),
            None => {
                self.storage.clear_auth_state().await?;
                return Err(operation_error("Callback fragment has no access_token"));
            }
        };
        let expires_in = params
            .get("expires_in")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);

        let record = TokenRecord::new(self.user.clone(), access_token, Utc::now(), expires_in);
        self.storage.store_token(&record).await?;
        self.storage.clear_auth_state().await?;

        info!("Calendar connected for {}", self.user);
        Ok(AuthOutcome::Connected)
    }

    /// Drop the stored token; the next calendar call will report
    /// `Unauthenticated` until the user reconnects
    pub async fn disconnect(&self) -> SyncResult<()> {
        self.storage.clear_token().await?;
        info!("Calendar disconnected for {}", self.user);
        Ok(())
    }
}
