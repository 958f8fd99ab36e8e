//! The capability the pipeline uses to reach the messaging platform.
//!
//! The pipeline never talks to WhatsApp directly: every lookup, download and
//! send goes through an injected [`TransportPort`]. The production
//! implementation is [`crate::whatsapp::client::WhatsAppClient`].

use async_trait::async_trait;

use crate::types::{Chat, Contact, MediaAsset, Message, OutboundAction};

/// Errors surfaced by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP request to the bridge failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The session is not authenticated yet.
    #[error("not connected to WhatsApp")]
    NotConnected,

    /// The requested chat, contact or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bridge answered with an error.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// The bridge answered with a payload we could not decode.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Lookups and sends the pipeline depends on.
///
/// Every method may suspend; implementations must be shareable across the
/// concurrently running event tasks.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Fetch a fresh snapshot of a chat, including its roster for groups.
    async fn get_chat(&self, chat_id: &str) -> Result<Chat, TransportError>;

    /// Look up a contact by id.
    async fn get_contact(&self, contact_id: &str) -> Result<Contact, TransportError>;

    /// Fetch the message quoted by `message_id`, if it still exists.
    async fn quoted_message(&self, message_id: &str) -> Result<Option<Message>, TransportError>;

    /// Download the media attached to `message_id`.
    ///
    /// Returns `Ok(None)` when the platform no longer holds the payload.
    async fn download_media(&self, message_id: &str) -> Result<Option<MediaAsset>, TransportError>;

    /// Id of the operator's own account, or `None` before authentication.
    async fn own_id(&self) -> Result<Option<String>, TransportError>;

    /// Dispatch one outbound action.
    async fn send(&self, action: &OutboundAction) -> Result<(), TransportError>;
}
