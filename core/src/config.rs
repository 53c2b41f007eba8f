//! Client configuration.
//!
//! Mirrors the frontend config object (`remote.API_SERVER`, `remote.authMode`)
//! plus the transport settings handed to the HTTP backend. Every section is
//! optional and falls back to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_API_SERVER: &str = "http://localhost:9999";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_RETRY: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 300;

/// Where the access token travels on each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `AccessToken` request header.
    #[default]
    AccessToken,
    /// `AccessToken` query parameter.
    AccessTokenInParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    #[serde(rename = "API_SERVER")]
    pub api_server: String,
    #[serde(rename = "authMode")]
    pub auth_mode: AuthMode,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_server: DEFAULT_API_SERVER.to_string(),
            auth_mode: AuthMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_ms: u64,
    /// Extra attempts after a connection-level failure.
    pub retry: u32,
    pub retry_delay_ms: u64,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: DEFAULT_RETRY,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            headers: vec![("Accept".to_string(), "application/json".to_string())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub remote: RemoteConfig,
    pub transport: TransportConfig,
    /// Overrides `LocalStorage::default_path()` when no host context is used.
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(api_server: &str) -> Self {
        Self {
            remote: RemoteConfig {
                api_server: api_server.to_string(),
                ..RemoteConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ApiError> {
        serde_json::from_str(s).map_err(|e| ApiError::Config(e.to_string()))
    }
}
