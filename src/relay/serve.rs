//! Newline-delimited JSON host: one message per input line, one reply per output line.

use super::controller::RelayController;
use super::envelope::Envelope;
use super::menu::TabMessage;
use super::router::Router;
use crate::config::RelayConfig;
use crate::settings::SettingsNotice;
use crate::Result;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Room for the JSON envelope around the text; escaping can double the text itself.
const LINE_OVERHEAD: usize = 16 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Deadline applied to each message.
    pub client_timeout: Duration,
    /// Longest accepted input line; longer lines are answered with `{ok: false}`.
    pub max_line_bytes: usize,
}

impl ServeOptions {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            client_timeout: config.client_timeout(),
            max_line_bytes: config
                .max_text_bytes
                .saturating_mul(2)
                .saturating_add(LINE_OVERHEAD),
        }
    }
}

/// Answer messages read from `input` until it ends.
///
/// Messages are handled concurrently. A message's `id` field, if present, is
/// copied onto its reply. Settings notices are written as unsolicited tab
/// messages; notices raised by the last messages before end of input are
/// still written before this returns.
pub async fn serve_ndjson<R, W>(
    relay: Arc<RelayController>,
    input: R,
    output: W,
    options: ServeOptions,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut notices = relay.settings().subscribe();
    let handle = Router::new(Arc::clone(&relay)).spawn(64);

    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        let mut sink = FramedWrite::new(output, LinesCodec::new());
        while let Some(line) = out_rx.recv().await {
            if let Err(e) = sink.send(line).await {
                warn!(error = %e, "failed to write reply");
                break;
            }
        }
    });

    info!(max_line_bytes = options.max_line_bytes, "serving NDJSON");
    let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(options.max_line_bytes));
    let mut replies = JoinSet::new();
    let mut notices_open = true;
    // The framed reader yields one `None` after a decode error before resuming.
    let mut resume_after_error = false;

    loop {
        tokio::select! {
            next = lines.next() => {
                let line = match next {
                    None if resume_after_error => {
                        resume_after_error = false;
                        continue;
                    }
                    None => break,
                    Some(Ok(line)) => line,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        resume_after_error = true;
                        warn!(limit = options.max_line_bytes, "dropping oversized message");
                        let reply = Envelope::failure_message(format!(
                            "message exceeds {} bytes",
                            options.max_line_bytes
                        ));
                        send_line(&out_tx, reply_line(reply, None)).await;
                        continue;
                    }
                    Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
                };
                resume_after_error = false;
                if line.trim().is_empty() {
                    continue;
                }
                let handle = handle.clone();
                let out_tx = out_tx.clone();
                replies.spawn(async move {
                    let line = match serde_json::from_str::<Value>(&line) {
                        Ok(message) => {
                            let id = message.get("id").cloned();
                            let envelope = handle.request(message, options.client_timeout).await;
                            reply_line(envelope, id)
                        }
                        Err(e) => {
                            let reply = Envelope::failure_message(format!("invalid JSON: {e}"));
                            reply_line(reply, None)
                        }
                    };
                    send_line(&out_tx, line).await;
                });
            }
            notice = notices.recv(), if notices_open => match notice {
                Ok(notice) => send_line(&out_tx, notice_line(notice)).await,
                Err(RecvError::Lagged(missed)) => warn!(missed, "settings notices dropped"),
                Err(RecvError::Closed) => notices_open = false,
            },
        }
    }

    while let Some(joined) = replies.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "reply task failed");
        }
    }
    // Every handler has finished, so its notices are already queued.
    loop {
        match notices.try_recv() {
            Ok(notice) => send_line(&out_tx, notice_line(notice)).await,
            Err(TryRecvError::Lagged(missed)) => warn!(missed, "settings notices dropped"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    drop(out_tx);
    drop(handle);
    if let Err(e) = writer.await {
        warn!(error = %e, "writer task failed");
    }
    Ok(())
}

fn reply_line(envelope: Envelope, id: Option<Value>) -> String {
    let mut reply = match serde_json::to_value(&envelope) {
        Ok(reply) => reply,
        Err(e) => return format!(r#"{{"ok":false,"error":"unencodable reply: {e}"}}"#),
    };
    if let (Some(id), Some(obj)) = (id, reply.as_object_mut()) {
        obj.insert("id".to_string(), id);
    }
    reply.to_string()
}

fn notice_line(notice: SettingsNotice) -> String {
    let msg = TabMessage::from(notice);
    serde_json::to_string(&msg).unwrap_or_default()
}

async fn send_line(out: &mpsc::Sender<String>, line: String) {
    if line.is_empty() {
        return;
    }
    if out.send(line).await.is_err() {
        debug!("output closed before the line was written");
    }
}
