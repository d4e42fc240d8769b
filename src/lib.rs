//! # neurodrive-relay
//!
//! NeuroDrive 文本辅助中继：为阅读辅助界面简化或摘要选中文本，并缓存结果。
//!
//! Relay between reading-assistance front ends and the NeuroDrive text
//! processing service.
//!
//! ## Overview
//!
//! A front end (context menu, popup, overlay) asks the relay to `simplify` or
//! `summarize` a piece of text. The relay reads the user's settings, builds
//! request options from them, and fingerprints the request with SHA-256. A
//! fingerprint seen before is answered from the cache without touching the
//! network; anything else is posted to `<api_url>/process` and the response is
//! cached verbatim.
//!
//! The relay is an error boundary: callers always get an [`relay::Envelope`],
//! either `{ok: true, payload, settings}` or `{ok: false, error}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neurodrive_relay::{Mode, RelayConfig, RelayController};
//!
//! #[tokio::main]
//! async fn main() -> neurodrive_relay::Result<()> {
//!     let config = RelayConfig::load(None)?;
//!     let relay = RelayController::from_config(&config)?;
//!
//!     let envelope = relay.process(Mode::Summarize, "A long paragraph...").await;
//!     if envelope.ok {
//!         println!("{}", envelope.payload.unwrap_or_default());
//!     } else {
//!         eprintln!("{}", envelope.error.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`relay`] | Controller, message router, context-menu entry points |
//! | [`settings`] | User preferences with defaults and persistent backends |
//! | [`cache`] | Content-addressed response cache |
//! | [`transport`] | HTTP client for the processing service |
//! | [`types`] | Request types shared across modules |
//! | [`config`] | Relay configuration (file, environment, keyring) |

pub mod cache;
pub mod config;
pub mod error;
pub mod relay;
pub mod settings;
pub mod transport;
pub mod types;
pub mod utils;

pub use cache::{CacheKey, RequestCache};
pub use config::RelayConfig;
pub use error::{Error, ErrorContext};
pub use relay::{Envelope, RelayController, Router};
pub use settings::{PartialSettings, Settings, SettingsStore};
pub use transport::{ApiClient, ProcessApi};
pub use types::{Mode, OptionsBag, ProcessRequest};

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
