use crate::components::storage::TokenStorage;
use crate::error::{Error, SyncResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tokens are treated as expired this many seconds before the instant
/// the provider reported, so a call never starts on a token about to
/// lapse mid-flight.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Identifier of a signed-in host user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored outcome of a completed authorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// User the token was granted to
    pub owner: UserId,
    /// Bearer token presented on calendar API calls
    pub access_token: String,
    /// When the authorization completed
    pub issued_at: DateTime<Utc>,
    /// When the provider said the token lapses
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from an authorization response's lifetime in seconds
    pub fn new(
        owner: UserId,
        access_token: String,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            owner,
            access_token,
            issued_at,
            expires_at: issued_at + Duration::seconds(expires_in_secs),
        }
    }

    /// Whether the token counts as expired at `now`, margin included
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Read side of the token slot, bound to the session user.
///
/// A stored record owned by a different user means the host switched
/// accounts since the connection was made; the slot is cleared rather
/// than ever presenting one user's token for another.
pub struct TokenStore {
    user: UserId,
    storage: Arc<dyn TokenStorage>,
}

impl TokenStore {
    pub fn new(user: UserId, storage: Arc<dyn TokenStorage>) -> Self {
        Self { user, storage }
    }

    /// Access token usable right now for the session user.
    ///
    /// `Unauthenticated` when the slot is empty or owned by someone
    /// else, `AuthExpired` when the stored token has lapsed. Both paths
    /// leave the slot empty.
    pub async fn access_token(&self) -> SyncResult<String> {
        let record = match self.storage.load_token().await? {
            Some(record) => record,
            None => return Err(Error::Unauthenticated),
        };

        if record.owner != self.user {
            warn!(
                "Stored calendar token belongs to {}, not {}; discarding it",
                record.owner, self.user
            );
            self.storage.clear_token().await?;
            return Err(Error::Unauthenticated);
        }

        if record.is_expired_at(Utc::now()) {
            debug!("Stored calendar token has expired; clearing the slot");
            self.storage.clear_token().await?;
            return Err(Error::AuthExpired);
        }

        Ok(record.access_token)
    }

    /// Whether a usable token exists for the session user
    pub async fn has_valid_token(&self) -> SyncResult<bool> {
        match self.access_token().await {
            Ok(_) => Ok(true),
            Err(Error::Unauthenticated) | Err(Error::AuthExpired) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop the stored token, whatever state it is in
    pub async fn clear(&self) -> SyncResult<()> {
        self.storage.clear_token().await
    }
}
