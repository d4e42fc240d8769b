//! Relay configuration: defaults, optional YAML file, environment overrides.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. a YAML file (`--config`, or `NDH_CONFIG`)
//! 3. environment variables:
//!    - `NDH_API_URL` base URL of the processing service (`/process` is appended)
//!    - `NDH_API_KEY` shared key sent as `x-api-key`
//!    - `NDH_HTTP_TIMEOUT_SECS` request deadline (default 180)
//!    - `NDH_CLIENT_TIMEOUT_SECS` caller-side deadline (default 185)
//!    - `NDH_MAX_TEXT_BYTES` largest accepted text (default 102400)
//!    - `NDH_COALESCE` `0`/`false` disables coalescing of identical requests
//!    - `NDH_DATA_DIR` where settings and cache live
//!
//! When no key is configured anywhere, the OS keyring entry
//! `neurodrive / api-key` is consulted.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const KEYRING_SERVICE: &str = "neurodrive";
pub const KEYRING_USER: &str = "api-key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub client_timeout_secs: u64,
    pub max_text_bytes: usize,
    pub coalesce_in_flight: bool,
    pub data_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001".to_string(),
            api_key: None,
            timeout_secs: 180,
            client_timeout_secs: 185,
            max_text_bytes: 102_400,
            coalesce_in_flight: true,
            data_dir: None,
        }
    }
}

impl RelayConfig {
    /// Defaults, then `path` (if any), then the process environment, then the keyring.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        if config.api_key.is_none() {
            config.api_key = key_from_keyring();
        }
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid config: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })
    }

    /// Overlay values from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("NDH_API_URL") {
            self.api_url = url;
        }
        if let Some(key) = lookup("NDH_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(v) = lookup("NDH_HTTP_TIMEOUT_SECS") {
            self.timeout_secs = parse_env("NDH_HTTP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("NDH_CLIENT_TIMEOUT_SECS") {
            self.client_timeout_secs = parse_env("NDH_CLIENT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("NDH_MAX_TEXT_BYTES") {
            self.max_text_bytes = parse_env("NDH_MAX_TEXT_BYTES", &v)?;
        }
        if let Some(v) = lookup("NDH_COALESCE") {
            self.coalesce_in_flight = !matches!(v.trim(), "0" | "false" | "off" | "no");
        }
        if let Some(dir) = lookup("NDH_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs.max(1))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("neurodrive"))
            .ok_or_else(|| {
                Error::configuration("cannot determine a data directory; set NDH_DATA_DIR")
            })
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("settings.json"))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("cache"))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        Error::configuration_with_context(
            format!("invalid value '{}': {}", value, e),
            ErrorContext::new().with_field_path(name).with_source("env"),
        )
    })
}

fn key_from_keyring() -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()?;
    match entry.get_password() {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::debug!(error = %e, "no API key in keyring");
            None
        }
    }
}
