//! 中继模块：连接界面触发、设置、缓存与远端文本处理服务。
//!
//! # Relay Module
//!
//! The entry point UI collaborators talk to. A process request loads the
//! current settings, derives request options, fingerprints the request, and
//! either serves a cached payload or calls the remote service and caches the
//! result. Every outcome is returned as an [`Envelope`].
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RelayController`] | Settings → cache → API orchestration, the error boundary |
//! | [`Envelope`] | `{ok, payload?, settings?, cached?, error?}` result |
//! | [`Router`] | Message `type` tag → handler mapping |
//! | [`RelayHandle`] | Caller side with its own deadline |
//! | [`SingleFlight`] | Coalesces identical concurrent fetches |
//! | [`TabMessage`] | Messages pushed to the page overlay |
//! | [`serve_ndjson`] | Line-delimited JSON host over any reader/writer pair |
//!
//! ## Example
//!
//! ```rust,no_run
//! use neurodrive_relay::config::RelayConfig;
//! use neurodrive_relay::relay::{RelayController, Router};
//! use std::sync::Arc;
//!
//! # async fn run() -> neurodrive_relay::Result<()> {
//! let config = RelayConfig::load(None)?;
//! let relay = Arc::new(RelayController::from_config(&config)?);
//! let handle = Router::new(relay).spawn(64);
//! let reply = handle
//!     .request(
//!         serde_json::json!({"type": "NDH_PROCESS_TEXT", "mode": "summarize", "text": "..."}),
//!         config.client_timeout(),
//!     )
//!     .await;
//! println!("{}", serde_json::to_string(&reply)?);
//! # Ok(())
//! # }
//! ```

mod controller;
mod envelope;
pub mod flight;
pub mod menu;
pub mod router;
pub mod serve;

pub use controller::{RelayController, RelayControllerBuilder, DEFAULT_MAX_TEXT_BYTES};
pub use envelope::Envelope;
pub use flight::SingleFlight;
pub use menu::{mode_for_menu, MenuItem, TabMessage, MENU_ITEMS};
pub use router::{RelayHandle, Reply, Router};
pub use serve::{serve_ndjson, ServeOptions};
