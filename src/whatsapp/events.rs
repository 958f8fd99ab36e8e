//! Event listener and wire format for bridge events.
//!
//! Connects to the bridge's `/events/poll` long-polling endpoint, validates
//! each event and forwards it to the router through an mpsc channel.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::WhatsAppError;
use crate::types::{ChatEvent, ConnectionLifecycle, MediaAsset, Message, MessageKind};

/// Maximum reconnect backoff (milliseconds).
const MAX_BACKOFF_MS: u64 = 30_000;

/// Initial reconnect backoff (milliseconds).
const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Pause after a non-200 poll response (seconds).
const NON_SUCCESS_PAUSE_SECS: u64 = 5;

/// An event as emitted by the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WhatsAppEvent {
    /// Login QR code is ready.
    Qr {
        /// Raw login token.
        code: String,
    },
    /// Loading-screen progress.
    Loading {
        /// Progress percentage.
        #[serde(default)]
        percent: u8,
        /// Status line.
        #[serde(default)]
        message: String,
    },
    /// Session authenticated and ready.
    Ready,
    /// Authentication rejected.
    AuthFailure {
        /// Reason, if available.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Session logged out.
    Disconnected {
        /// Reason, if available.
        #[serde(default)]
        reason: Option<String>,
    },
    /// A message was created (incoming or sent by us).
    Message {
        /// The message.
        message: WireMessage,
    },
    /// A message was deleted for everyone.
    MessageRevokeEveryone {
        /// The message before deletion, when the bridge saw it.
        #[serde(default)]
        before: Option<WireMessage>,
    },
}

/// A message as serialized by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// Serialized message id.
    pub id: String,
    /// Chat the message belongs to.
    pub from: String,
    /// Group member who wrote it; absent in direct chats.
    #[serde(default)]
    pub author: Option<String>,
    /// Text or caption.
    #[serde(default)]
    pub body: String,
    /// Platform message type (`chat`, `image`, `ptt`, `sticker`, ...).
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Whether media can be downloaded.
    #[serde(default)]
    pub has_media: bool,
    /// View-once flag.
    #[serde(default)]
    pub is_view_once: bool,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Whether the message quotes another one.
    #[serde(default)]
    pub has_quoted_msg: bool,
    /// The quoted message, when the bridge inlines it.
    #[serde(default)]
    pub quoted: Option<Box<WireMessage>>,
}

impl TryFrom<WireMessage> for Message {
    type Error = WhatsAppError;

    /// Validate a wire message. The sender is the author in groups and the
    /// chat itself in direct chats.
    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        if wire.id.trim().is_empty() {
            return Err(WhatsAppError::InvalidPayload("message id is empty".to_owned()));
        }
        if wire.from.trim().is_empty() {
            return Err(WhatsAppError::InvalidPayload(format!(
                "message {} has no chat id",
                wire.id
            )));
        }

        let quoted = match wire.quoted {
            Some(q) => Some(Box::new(Message::try_from(*q)?)),
            None => None,
        };
        let sender_id = wire
            .author
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| wire.from.clone());

        Ok(Message {
            id: wire.id,
            chat_id: wire.from,
            sender_id,
            body: wire.body,
            kind: message_kind(&wire.kind),
            has_media: wire.has_media,
            is_ephemeral: wire.is_view_once,
            timestamp: wire.timestamp.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            is_quoted_reply: wire.has_quoted_msg || quoted.is_some(),
            quoted,
        })
    }
}

/// Map the platform's message type string.
pub fn message_kind(kind: &str) -> MessageKind {
    match kind {
        "chat" | "text" | "" => MessageKind::Text,
        "image" => MessageKind::Image,
        "video" => MessageKind::Video,
        "audio" => MessageKind::Audio,
        "ptt" => MessageKind::Voice,
        "document" => MessageKind::Document,
        "sticker" => MessageKind::Sticker,
        _ => MessageKind::Other,
    }
}

/// Media as serialized by the bridge: base64 payload plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMedia {
    /// MIME type.
    pub mimetype: String,
    /// Base64-encoded bytes.
    pub data: String,
    /// Original filename.
    #[serde(default)]
    pub filename: Option<String>,
}

impl TryFrom<WireMedia> for MediaAsset {
    type Error = WhatsAppError;

    fn try_from(wire: WireMedia) -> Result<Self, Self::Error> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(wire.data.as_bytes())
            .map_err(|e| WhatsAppError::InvalidPayload(format!("media is not base64: {e}")))?;
        Ok(MediaAsset {
            mime_type: wire.mimetype,
            bytes,
            filename: wire.filename,
        })
    }
}

impl From<&MediaAsset> for WireMedia {
    fn from(media: &MediaAsset) -> Self {
        Self {
            mimetype: media.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&media.bytes),
            filename: media.filename.clone(),
        }
    }
}

impl WhatsAppEvent {
    /// Validate and convert into a pipeline event.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::InvalidPayload`] if an embedded message fails
    /// validation.
    pub fn into_chat_event(self) -> Result<ChatEvent, WhatsAppError> {
        let event = match self {
            Self::Qr { code } => ChatEvent::Lifecycle(ConnectionLifecycle::Qr { code }),
            Self::Loading { percent, message } => {
                ChatEvent::Lifecycle(ConnectionLifecycle::Loading { percent, message })
            }
            Self::Ready => ChatEvent::Lifecycle(ConnectionLifecycle::Ready),
            Self::AuthFailure { reason } => ChatEvent::Lifecycle(ConnectionLifecycle::AuthFailure {
                reason: reason.unwrap_or_default(),
            }),
            Self::Disconnected { reason } => {
                ChatEvent::Lifecycle(ConnectionLifecycle::Disconnected {
                    reason: reason.unwrap_or_default(),
                })
            }
            Self::Message { message } => ChatEvent::IncomingMessage(Message::try_from(message)?),
            Self::MessageRevokeEveryone { before } => ChatEvent::MessageRevoked {
                before: before.map(Message::try_from).transpose()?,
            },
        };
        Ok(event)
    }
}

/// Decode one poll batch. Malformed entries are logged and skipped so one bad
/// event does not cost the rest of the batch.
pub fn decode_batch(batch: Vec<serde_json::Value>) -> Vec<ChatEvent> {
    batch
        .into_iter()
        .filter_map(|raw| {
            let event = match serde_json::from_value::<WhatsAppEvent>(raw) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable bridge event");
                    return None;
                }
            };
            match event.into_chat_event() {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "dropping invalid bridge event");
                    None
                }
            }
        })
        .collect()
}

/// Spawn an event listener that forwards events to the given channel.
///
/// Returns immediately. The listener runs as a background Tokio task,
/// reconnects with exponential backoff, and stops once the receiver is dropped.
pub fn spawn_event_listener(
    base_url: String,
    poll_timeout_secs: u64,
    event_tx: mpsc::Sender<ChatEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let poll_url = format!("{base_url}/events/poll");
        let mut backoff_ms: u64 = INITIAL_BACKOFF_MS;

        loop {
            info!(url = %poll_url, "connecting to WhatsApp event stream");

            match poll_events(&poll_url, poll_timeout_secs, &event_tx).await {
                Ok(()) => {
                    info!("WhatsApp event stream closed normally");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, backoff_ms, "WhatsApp event stream error, reconnecting");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                }
            }
        }
    })
}

/// Poll the bridge in a loop. Returns `Err` on non-timeout network errors so
/// the caller can reconnect with backoff, `Ok` once the receiver is gone.
async fn poll_events(
    poll_url: &str,
    poll_timeout_secs: u64,
    event_tx: &mpsc::Sender<ChatEvent>,
) -> Result<(), WhatsAppError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(poll_timeout_secs))
        .build()?;

    loop {
        match client.get(poll_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let batch = match resp.json::<Vec<serde_json::Value>>().await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(error = %e, "event poll returned malformed batch");
                        continue;
                    }
                };
                for event in decode_batch(batch) {
                    debug!(?event, "received WhatsApp event");
                    if event_tx.send(event).await.is_err() {
                        // Receiver dropped: shut down cleanly.
                        return Ok(());
                    }
                }
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "event poll returned non-200");
                tokio::time::sleep(std::time::Duration::from_secs(NON_SUCCESS_PAUSE_SECS)).await;
            }
            Err(e) if e.is_timeout() => {
                // Long-poll expired with no events.
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        if event_tx.is_closed() {
            return Ok(());
        }
    }
}
