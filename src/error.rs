use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the subsystem
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Calendar authorization has expired, the user must reconnect")]
    #[diagnostic(code(surgisync::auth_expired))]
    AuthExpired,

    #[error("No calendar authorization is stored for this user")]
    #[diagnostic(code(surgisync::unauthenticated))]
    Unauthenticated,

    #[error("Authorization callback state does not match the pending request")]
    #[diagnostic(code(surgisync::csrf_state_mismatch))]
    CsrfStateMismatch,

    #[error("Network failure talking to the calendar provider: {0}")]
    #[diagnostic(code(surgisync::network))]
    NetworkFailure(String),

    #[error("Calendar operation failed: {0}")]
    #[diagnostic(code(surgisync::operation))]
    OperationFailed(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(surgisync::storage))]
    Storage(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(surgisync::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(surgisync::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(surgisync::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(surgisync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(surgisync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(surgisync::other))]
    Other(String),
}

// Transport-level reqwest failures are network errors; HTTP status
// handling happens at the call sites that can see the response.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkFailure(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML serialization errors
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create calendar operation errors
pub fn operation_error(message: &str) -> Error {
    Error::OperationFailed(message.to_string())
}

/// Helper to create other errors
#[allow(dead_code)]
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
