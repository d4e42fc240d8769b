//! Context-menu entry points and the messages pushed to the page overlay.

use super::controller::RelayController;
use super::envelope::Envelope;
use crate::settings::{ColorBlindnessMode, Settings, SettingsNotice};
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MENU_SIMPLIFY: &str = "ndh_simplify";
pub const MENU_SUMMARIZE: &str = "ndh_summarize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub id: &'static str,
    pub title: &'static str,
    pub mode: Mode,
}

/// Items offered on a text selection.
pub const MENU_ITEMS: [MenuItem; 2] = [
    MenuItem {
        id: MENU_SIMPLIFY,
        title: "Simplify with NeuroDrive",
        mode: Mode::Simplify,
    },
    MenuItem {
        id: MENU_SUMMARIZE,
        title: "Summarize with NeuroDrive",
        mode: Mode::Summarize,
    },
];

pub fn mode_for_menu(id: &str) -> Option<Mode> {
    MENU_ITEMS.iter().find(|item| item.id == id).map(|item| item.mode)
}

/// Messages delivered to the overlay running in a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TabMessage {
    #[serde(rename = "NDH_SHOW_RESULT")]
    ShowResult {
        data: Value,
        settings: Settings,
        mode: Mode,
    },
    #[serde(rename = "NDH_ERROR")]
    Error { error: String },
    #[serde(rename = "APPLY_DISTRACTION_REDUCER")]
    ApplyDistractionReducer { enabled: bool },
    #[serde(rename = "APPLY_COLOR_BLINDNESS_MODE")]
    ApplyColorBlindnessMode { mode: ColorBlindnessMode },
}

impl TabMessage {
    /// Result or error message for the overlay, from a relay envelope.
    pub fn from_envelope(envelope: Envelope, mode: Mode) -> Self {
        match envelope {
            Envelope {
                ok: true,
                payload: Some(data),
                settings,
                ..
            } => TabMessage::ShowResult {
                data,
                settings: settings.unwrap_or_default(),
                mode,
            },
            Envelope { error, .. } => TabMessage::Error {
                error: error.unwrap_or_else(|| "Unknown error occurred".to_string()),
            },
        }
    }
}

impl From<SettingsNotice> for TabMessage {
    fn from(notice: SettingsNotice) -> Self {
        match notice {
            SettingsNotice::DistractionReducer { enabled } => {
                TabMessage::ApplyDistractionReducer { enabled }
            }
            SettingsNotice::ColorBlindnessMode { mode } => TabMessage::ApplyColorBlindnessMode { mode },
        }
    }
}

impl RelayController {
    /// Handle a context-menu click on a selection.
    ///
    /// Returns `None` when there is nothing to show: an empty selection or a
    /// menu id this relay does not own.
    pub async fn on_menu_click(&self, menu_id: &str, selection: &str) -> Option<TabMessage> {
        if selection.trim().is_empty() {
            return None;
        }
        let Some(mode) = mode_for_menu(menu_id) else {
            tracing::debug!(menu_id, "ignoring click on foreign menu item");
            return None;
        };
        let envelope = self.process(mode, selection).await;
        Some(TabMessage::from_envelope(envelope, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ProcessApi;
    use crate::types::ProcessRequest;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct FixedApi(Option<u16>);

    #[async_trait]
    impl ProcessApi for FixedApi {
        async fn process(&self, request: &ProcessRequest) -> Result<Value> {
            match self.0 {
                Some(status) => Err(Error::Api {
                    status,
                    body: "Invalid API key".into(),
                }),
                None => Ok(json!({"output": "short version", "mode": request.mode()})),
            }
        }
    }

    fn relay(fail: Option<u16>) -> RelayController {
        RelayController::builder()
            .api(Arc::new(FixedApi(fail)))
            .build()
            .unwrap()
    }

    #[test]
    fn menu_ids_map_to_modes() {
        assert_eq!(mode_for_menu(MENU_SIMPLIFY), Some(Mode::Simplify));
        assert_eq!(mode_for_menu(MENU_SUMMARIZE), Some(Mode::Summarize));
        assert_eq!(mode_for_menu("ndh_translate"), None);
    }

    #[tokio::test]
    async fn click_produces_show_result() {
        let msg = relay(None)
            .on_menu_click(MENU_SUMMARIZE, "Some long paragraph")
            .await
            .unwrap();
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["type"], "NDH_SHOW_RESULT");
        assert_eq!(wire["mode"], "summarize");
        assert_eq!(wire["data"]["output"], "short version");
        assert_eq!(wire["settings"]["audience"], "general");
    }

    #[tokio::test]
    async fn click_failure_produces_error_message() {
        let msg = relay(Some(401))
            .on_menu_click(MENU_SIMPLIFY, "text")
            .await
            .unwrap();
        match msg {
            TabMessage::Error { error } => assert!(error.contains("401")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_selection_or_foreign_item_is_ignored() {
        let r = relay(None);
        assert!(r.on_menu_click(MENU_SIMPLIFY, "  ").await.is_none());
        assert!(r.on_menu_click("other_extension_item", "text").await.is_none());
    }

    #[test]
    fn notices_become_tab_messages() {
        let msg: TabMessage = SettingsNotice::DistractionReducer { enabled: true }.into();
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "APPLY_DISTRACTION_REDUCER", "enabled": true})
        );
        let msg: TabMessage = SettingsNotice::ColorBlindnessMode {
            mode: ColorBlindnessMode::Tritanopia,
        }
        .into();
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "APPLY_COLOR_BLINDNESS_MODE", "mode": "tritanopia"})
        );
    }
}
