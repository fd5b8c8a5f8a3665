//! Socket Mode listener: receives events over a WebSocket instead of a public
//! HTTP endpoint.
//!
//! Every envelope carrying an `envelope_id` is acknowledged before the event is
//! forwarded. A `disconnect` envelope or any socket failure ends the session;
//! the listener then opens a new one, backing off on failures.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use checkin_core::{ChannelId, ChatEvent, ChatPlatform, EventKind, MessageTs, PlatformError, UserId};

use crate::client::SlackClient;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// One decoded Socket Mode frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Connection established.
    Hello,
    /// Slack is about to close this connection.
    Disconnect { reason: String },
    /// An Events API delivery.
    EventsApi { envelope_id: String, event: Value },
    /// Anything else (slash commands, interactivity). Acked, then dropped.
    Other { envelope_id: Option<String> },
}

impl Envelope {
    fn envelope_id(&self) -> Option<&str> {
        match self {
            Self::EventsApi { envelope_id, .. } => Some(envelope_id),
            Self::Other { envelope_id } => envelope_id.as_deref(),
            Self::Hello | Self::Disconnect { .. } => None,
        }
    }
}

/// Parse one text frame.
pub fn parse_envelope(text: &str) -> Result<Envelope, PlatformError> {
    let frame: Value =
        serde_json::from_str(text).map_err(|e| PlatformError::Decode(format!("socket frame: {e}")))?;
    let envelope_id = frame
        .get("envelope_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(match frame.get("type").and_then(Value::as_str) {
        Some("hello") => Envelope::Hello,
        Some("disconnect") => Envelope::Disconnect {
            reason: frame
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        Some("events_api") => match envelope_id {
            Some(envelope_id) => Envelope::EventsApi {
                envelope_id,
                event: frame
                    .pointer("/payload/event")
                    .cloned()
                    .unwrap_or(Value::Null),
            },
            None => Envelope::Other { envelope_id: None },
        },
        _ => Envelope::Other { envelope_id },
    })
}

/// Turn an Events API `event` object into a [`ChatEvent`].
///
/// Returns `None` for event types the bot ignores, bot-authored messages,
/// message edits/deletes (any `subtype`), and the bot's own posts.
pub fn decode_event(event: &Value, bot: &UserId) -> Option<ChatEvent> {
    let kind = match event.get("type").and_then(Value::as_str)? {
        "app_mention" => EventKind::Mention,
        "message" => {
            if event.get("subtype").is_some() || event.get("bot_id").is_some() {
                return None;
            }
            EventKind::Message
        }
        _ => return None,
    };

    let field = |name: &str| event.get(name).and_then(Value::as_str);
    let author = field("user")?;
    if author == bot.as_str() {
        return None;
    }

    Some(ChatEvent {
        kind,
        author: UserId::from_raw(author),
        text: field("text").unwrap_or_default().to_string(),
        channel: ChannelId::from_raw(field("channel")?),
        ts: MessageTs::from_raw(field("ts")?),
        thread_ts: field("thread_ts").map(MessageTs::from_raw),
    })
}

fn ack(envelope_id: &str) -> Message {
    Message::Text(json!({ "envelope_id": envelope_id }).to_string().into())
}

enum SessionEnd {
    Cancelled,
    Disconnect,
}

/// Long-running Socket Mode consumer.
pub struct SocketModeListener {
    client: Arc<SlackClient>,
    max_backoff: Duration,
}

impl SocketModeListener {
    /// `max_backoff` caps the delay between failed sessions.
    pub fn new(client: Arc<SlackClient>, max_backoff: Duration) -> Self {
        Self {
            client,
            max_backoff: max_backoff.max(INITIAL_BACKOFF),
        }
    }

    /// Forward events into `events` until `cancel` fires or the receiver is dropped.
    pub async fn run(&self, events: mpsc::Sender<ChatEvent>, cancel: CancellationToken) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.session(&events, &cancel).await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::Disconnect) => {
                    info!("socket mode disconnect requested, reconnecting");
                    backoff = INITIAL_BACKOFF;
                }
                Err(e) => {
                    let delay = match &e {
                        PlatformError::RateLimited {
                            retry_after_secs: Some(secs),
                            ..
                        } => Duration::from_secs(*secs),
                        _ => backoff,
                    };
                    warn!(
                        error = %e,
                        kind = e.error_kind(),
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "socket mode session failed"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
        info!("socket mode listener stopped");
    }

    async fn session(
        &self,
        events: &mpsc::Sender<ChatEvent>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, PlatformError> {
        let bot = self.client.identity().await?;
        let url = self.client.open_connection().await?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PlatformError::Socket(format!("connect: {e}")))?;
        let (mut ws_tx, mut ws_rx) = ws.split();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Cancelled);
                }
                msg = ws_rx.next() => {
                    let msg = msg
                        .ok_or_else(|| PlatformError::Socket("stream ended".into()))?
                        .map_err(|e| PlatformError::Socket(e.to_string()))?;
                    let text = match msg {
                        Message::Text(text) => text,
                        Message::Close(frame) => {
                            return Err(PlatformError::Socket(format!("closed by server: {frame:?}")));
                        }
                        _ => continue,
                    };

                    let envelope = match parse_envelope(text.as_str()) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!(error = %e, "skipping undecodable socket frame");
                            continue;
                        }
                    };
                    if let Some(id) = envelope.envelope_id() {
                        ws_tx
                            .send(ack(id))
                            .await
                            .map_err(|e| PlatformError::Socket(format!("ack: {e}")))?;
                    }

                    match envelope {
                        Envelope::Hello => debug!("socket mode connected"),
                        Envelope::Disconnect { reason } => {
                            debug!(%reason, "socket mode disconnect");
                            return Ok(SessionEnd::Disconnect);
                        }
                        Envelope::EventsApi { event, .. } => {
                            if let Some(event) = decode_event(&event, &bot) {
                                if events.send(event).await.is_err() {
                                    return Ok(SessionEnd::Cancelled);
                                }
                            }
                        }
                        Envelope::Other { .. } => {}
                    }
                }
            }
        }
    }
}
