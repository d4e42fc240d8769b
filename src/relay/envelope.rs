//! The uniform result shape returned to UI callers.

use crate::settings::Settings;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ok, payload?, settings?, cached?, error?}`.
///
/// Failures carry only the rendered message, which the UI shows verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pong: Option<bool>,
}

impl Envelope {
    fn empty(ok: bool) -> Self {
        Self {
            ok,
            payload: None,
            settings: None,
            cached: None,
            error: None,
            pong: None,
        }
    }

    pub fn success(payload: Value, settings: Settings, cached: bool) -> Self {
        Self {
            payload: Some(payload),
            settings: Some(settings),
            cached: Some(cached),
            ..Self::empty(true)
        }
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::empty(true)
        }
    }

    pub fn pong() -> Self {
        Self {
            pong: Some(true),
            ..Self::empty(true)
        }
    }

    pub fn failure(error: &Error) -> Self {
        Self::failure_message(error.to_string())
    }

    pub fn failure_message(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(false)
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.unwrap_or(false)
    }
}
