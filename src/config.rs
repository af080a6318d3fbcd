use crate::error::{config_error, env_error, SyncResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use toml;

/// OAuth scope requested when connecting a calendar
pub const DEFAULT_OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// Production calendar API endpoint
pub const DEFAULT_CALENDAR_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Production authorization endpoint
pub const DEFAULT_OAUTH_AUTH_BASE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Seconds between connection checks when no interval is configured
pub const DEFAULT_CONNECTION_CHECK_INTERVAL_SECS: u64 = 300;

/// Main configuration structure for the subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google Calendar API client ID
    pub google_client_id: String,
    /// Calendar to mirror cases into
    pub google_calendar_id: String,
    /// OAuth scope requested during authorization
    pub oauth_scope: String,
    /// Loopback port the authorization callback listens on
    pub oauth_redirect_port: u16,
    /// Clinic timezone used when building event times
    pub timezone: String,
    /// Redis connection URL for the token slot
    pub redis_url: String,
    /// Seconds between calendar connectivity checks
    pub connection_check_interval_secs: u64,
    /// Calendar API base URL (overridable for local testing)
    pub calendar_api_base_url: String,
    /// Authorization endpoint base URL (overridable for local testing)
    pub oauth_auth_base_url: String,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;

        // Everything else has a sensible default
        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| String::from("primary"));
        let oauth_scope =
            env::var("OAUTH_SCOPE").unwrap_or_else(|_| String::from(DEFAULT_OAUTH_SCOPE));
        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1:6379"));

        let oauth_redirect_port = match env::var("OAUTH_REDIRECT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| config_error("Invalid OAUTH_REDIRECT_PORT format"))?,
            Err(_) => 8080,
        };

        let connection_check_interval_secs = match env::var("CONNECTION_CHECK_INTERVAL_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .map_err(|_| config_error("Invalid CONNECTION_CHECK_INTERVAL_SECS format"))?,
            Err(_) => DEFAULT_CONNECTION_CHECK_INTERVAL_SECS,
        };

        let calendar_api_base_url = env::var("CALENDAR_API_BASE_URL")
            .unwrap_or_else(|_| String::from(DEFAULT_CALENDAR_API_BASE_URL));
        let oauth_auth_base_url = env::var("OAUTH_AUTH_BASE_URL")
            .unwrap_or_else(|_| String::from(DEFAULT_OAUTH_AUTH_BASE_URL));

        // Initialize default components
        let mut components = HashMap::new();
        components.insert("calendar_sync".to_string(), true);

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_components {
                    components.insert(key, value);
                }
            }
        }

        Ok(Config {
            google_client_id,
            google_calendar_id,
            oauth_scope,
            oauth_redirect_port,
            timezone,
            redis_url,
            connection_check_interval_secs,
            calendar_api_base_url,
            oauth_auth_base_url,
            components,
        })
    }

    /// Parse the configured timezone
    pub fn clinic_timezone(&self) -> SyncResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Loopback redirect URI the authorization flow sends the browser back to
    pub fn oauth_redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.oauth_redirect_port)
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }

    /// Update component enabled status
    #[allow(dead_code)]
    pub fn set_component_enabled(&mut self, name: &str, enabled: bool) -> SyncResult<()> {
        self.components.insert(name.to_string(), enabled);
        self.save_components()
    }

    /// Save component configuration to file
    #[allow(dead_code)]
    fn save_components(&self) -> SyncResult<()> {
        // Create config directory if it doesn't exist
        if !Path::new("config").exists() {
            fs::create_dir("config")?;
        }

        let toml_str = toml::to_string(&self.components)?;
        fs::write("config/components.toml", toml_str)?;

        Ok(())
    }
}
