//! Message dispatch: tag → handler, with a resolve-once reply per message.

use super::controller::RelayController;
use super::envelope::Envelope;
use crate::settings::PartialSettings;
use crate::types::Mode;
use crate::{Error, ErrorContext, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const PROCESS_TEXT: &str = "NDH_PROCESS_TEXT";
pub const PING: &str = "NDH_PING";
pub const GET_SETTINGS: &str = "NDH_GET_SETTINGS";
pub const SAVE_SETTINGS: &str = "NDH_SAVE_SETTINGS";

pub type Handler =
    Arc<dyn Fn(Arc<RelayController>, Value) -> BoxFuture<'static, Result<Envelope>> + Send + Sync>;

#[derive(Debug, Deserialize)]
struct ProcessText {
    mode: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SaveSettings {
    settings: PartialSettings,
}

/// Explicit mapping from a message's `type` tag to its handler.
///
/// Every message gets exactly one envelope back; unknown or malformed messages
/// are answered with `{ok: false}` instead of being dropped.
pub struct Router {
    controller: Arc<RelayController>,
    handlers: HashMap<String, Handler>,
}

impl Router {
    /// Router with the standard relay handlers registered.
    pub fn new(controller: Arc<RelayController>) -> Self {
        Self::empty(controller)
            .route(PROCESS_TEXT, handle_process_text)
            .route(PING, handle_ping)
            .route(GET_SETTINGS, handle_get_settings)
            .route(SAVE_SETTINGS, handle_save_settings)
    }

    /// Router with no handlers; every message is unknown until routed.
    pub fn empty(controller: Arc<RelayController>) -> Self {
        Self {
            controller,
            handlers: HashMap::new(),
        }
    }

    /// Register (or replace) the handler for `tag`.
    pub fn route<F, Fut>(mut self, tag: &str, handler: F) -> Self
    where
        F: Fn(Arc<RelayController>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |relay, msg| handler(relay, msg).boxed());
        self.handlers.insert(tag.to_string(), handler);
        self
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub async fn dispatch(&self, message: Value) -> Envelope {
        let tag = match message.get("type").and_then(Value::as_str) {
            Some(tag) => tag.to_string(),
            None => {
                return Envelope::failure(&Error::validation_with_context(
                    "message has no string 'type' field",
                    ErrorContext::new().with_field_path("type"),
                ))
            }
        };
        let Some(handler) = self.handlers.get(&tag) else {
            tracing::warn!(tag = %tag, "unknown message type");
            return Envelope::failure(&Error::UnknownMessage { tag });
        };
        tracing::debug!(tag = %tag, "dispatching message");
        match handler(Arc::clone(&self.controller), message).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "handler failed");
                Envelope::failure(&e)
            }
        }
    }

    /// Serve messages on a background task; each message is handled concurrently.
    pub fn spawn(self, buffer: usize) -> RelayHandle {
        let (tx, mut rx) = mpsc::channel::<Job>(buffer.max(1));
        let router = Arc::new(self);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let envelope = router.dispatch(job.message).await;
                    job.reply.send(envelope);
                });
            }
            tracing::debug!("relay channel closed");
        });
        RelayHandle { tx }
    }
}

async fn handle_process_text(relay: Arc<RelayController>, message: Value) -> Result<Envelope> {
    let msg: ProcessText = parse(PROCESS_TEXT, message)?;
    let mode: Mode = msg.mode.parse()?;
    Ok(relay.process(mode, &msg.text).await)
}

async fn handle_ping(_: Arc<RelayController>, _: Value) -> Result<Envelope> {
    Ok(Envelope::pong())
}

async fn handle_get_settings(relay: Arc<RelayController>, _: Value) -> Result<Envelope> {
    Ok(Envelope::with_settings(relay.settings().get().await))
}

async fn handle_save_settings(relay: Arc<RelayController>, message: Value) -> Result<Envelope> {
    let msg: SaveSettings = parse(SAVE_SETTINGS, message)?;
    let settings = relay.settings().set(msg.settings).await?;
    Ok(Envelope::with_settings(settings))
}

fn parse<T: serde::de::DeserializeOwned>(tag: &str, message: Value) -> Result<T> {
    serde_json::from_value(message).map_err(|e| {
        Error::validation_with_context(
            format!("malformed {} message: {}", tag, e),
            ErrorContext::new().with_source("router"),
        )
    })
}

/// One-shot reply slot. Sending consumes it, so a message cannot be answered twice.
pub struct Reply(oneshot::Sender<Envelope>);

impl Reply {
    pub fn send(self, envelope: Envelope) {
        if self.0.send(envelope).is_err() {
            tracing::debug!("caller stopped waiting before the reply was ready");
        }
    }
}

struct Job {
    message: Value,
    reply: Reply,
}

/// Caller side of a spawned [`Router`].
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<Job>,
}

impl RelayHandle {
    /// Send `message` and wait at most `timeout` for its envelope.
    ///
    /// A reply slot dropped without an answer counts as a failure, the same as
    /// the deadline passing.
    pub async fn request(&self, message: Value, timeout: Duration) -> Envelope {
        let (tx, rx) = oneshot::channel();
        let job = Job {
            message,
            reply: Reply(tx),
        };
        if self.tx.send(job).await.is_err() {
            return Envelope::failure_message("Relay is not running. Try reloading the extension.");
        }
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(_)) => Envelope::failure_message(
                "No response from relay. Try reloading the extension.",
            ),
            Err(_) => Envelope::failure(&Error::Timeout { after: timeout }),
        }
    }
}
