//! Runtime configuration for a ZenMark session.
//!
//! Values come from the caller (CLI profile, environment). Everything here is
//! plain `serde` data; nothing is read from disk by the core itself.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_SYNC_INTERVAL_SECS: &str = "ZENMARK_SYNC_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ZENMARK_REQUEST_TIMEOUT_SECS";

/// Connection settings for the remote replica store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl RemoteConfig {
    /// Build a remote config from optional parts.
    ///
    /// Returns `Ok(None)` when neither URL nor key is set (local-only mode)
    /// and an error when only one of them is.
    pub fn resolve(
        url: Option<String>,
        api_key: Option<String>,
        access_token: Option<String>,
    ) -> Result<Option<Self>> {
        let url = normalize_text_option(url);
        let api_key = normalize_text_option(api_key);

        match (url, api_key) {
            (None, None) => Ok(None),
            (Some(url), Some(api_key)) => {
                if !is_http_url(&url) {
                    return Err(Error::InvalidInput(format!(
                        "remote URL must include http:// or https://: {url}"
                    )));
                }
                Ok(Some(Self {
                    url,
                    api_key,
                    access_token: normalize_text_option(access_token),
                    request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                }))
            }
            (Some(_), None) => Err(Error::InvalidInput(
                "remote URL is set but the API key is missing".to_string(),
            )),
            (None, Some(_)) => Err(Error::InvalidInput(
                "API key is set but the remote URL is missing".to_string(),
            )),
        }
    }
}

/// Timing knobs of the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between scheduled passes
    pub interval_secs: u64,
    /// Upper bound for a single remote call
    pub request_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ReconcileConfig {
    /// Defaults overridden by `ZENMARK_SYNC_INTERVAL_SECS` and
    /// `ZENMARK_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            interval_secs: env_secs(ENV_SYNC_INTERVAL_SECS)?.unwrap_or(defaults.interval_secs),
            request_timeout_secs: env_secs(ENV_REQUEST_TIMEOUT_SECS)?
                .unwrap_or(defaults.request_timeout_secs),
        })
    }

    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Everything needed to open a [`crate::services::Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Local database file; `None` opens an in-memory replica.
    pub db_path: Option<PathBuf>,
    pub user_id: String,
    /// Recorded on every version snapshot written by this device.
    pub device_id: String,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl SessionConfig {
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            db_path: None,
            user_id: user_id.into(),
            device_id: device_id.into(),
            remote: None,
            reconcile: ReconcileConfig::default(),
        }
    }

    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Option<RemoteConfig>) -> Self {
        self.remote = remote;
        self
    }

    #[must_use]
    pub const fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Reject blank identities and zero durations before anything is written.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        if self.device_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "device id must not be empty".to_string(),
            ));
        }
        if self.reconcile.interval_secs == 0 {
            return Err(Error::InvalidInput(
                "sync interval must be at least one second".to_string(),
            ));
        }
        if self.reconcile.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn env_secs(key: &str) -> Result<Option<u64>> {
    let Some(raw) = normalize_text_option(std::env::var(key).ok()) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| Error::InvalidInput(format!("{key} must be a whole number of seconds, got '{raw}'")))
}
