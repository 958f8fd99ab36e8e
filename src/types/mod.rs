//! Core chat types shared by the pipeline and the transport adapter.
//!
//! Everything here is produced at the adapter boundary (see
//! [`crate::whatsapp::events`]) and is read-only to the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat id of the platform's broadcast/status channel.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// A normalized event delivered by the transport adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A message was created in any chat (including our own outgoing messages).
    IncomingMessage(Message),
    /// A message was deleted for everyone.
    MessageRevoked {
        /// The message as it looked before deletion, when the client observed it.
        before: Option<Message>,
    },
    /// Session/connection lifecycle notification.
    Lifecycle(ConnectionLifecycle),
}

/// Connection lifecycle notifications from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionLifecycle {
    /// A login token is ready to be scanned.
    Qr {
        /// Raw login token payload.
        code: String,
    },
    /// The client is loading chats.
    Loading {
        /// Progress percentage.
        percent: u8,
        /// Human-readable status line.
        message: String,
    },
    /// The session is authenticated and ready.
    Ready,
    /// Authentication was rejected.
    AuthFailure {
        /// Reason reported by the transport.
        reason: String,
    },
    /// The session was logged out or dropped.
    Disconnected {
        /// Reason reported by the transport.
        reason: String,
    },
}

/// Media category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text.
    Text,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
    /// Audio file.
    Audio,
    /// Push-to-talk voice note.
    Voice,
    /// Generic document.
    Document,
    /// Sticker.
    Sticker,
    /// Anything the adapter does not classify.
    Other,
}

/// A chat message as seen by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Transport-assigned message id.
    pub id: String,
    /// Chat the message was posted in.
    pub chat_id: String,
    /// Author of the message: the group member in groups, the chat id otherwise.
    pub sender_id: String,
    /// Text body (caption for media messages, may be empty).
    pub body: String,
    /// Media category.
    pub kind: MessageKind,
    /// Whether a media payload can be downloaded for this message.
    pub has_media: bool,
    /// View-once flag.
    pub is_ephemeral: bool,
    /// Send time, if the transport reported one.
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether the message is a reply to another message.
    pub is_quoted_reply: bool,
    /// The quoted message, when the adapter already resolved it.
    pub quoted: Option<Box<Message>>,
}

impl Message {
    /// Build a plain text message with every optional flag cleared.
    pub fn text(id: &str, chat_id: &str, sender_id: &str, body: &str) -> Self {
        Self {
            id: id.to_owned(),
            chat_id: chat_id.to_owned(),
            sender_id: sender_id.to_owned(),
            body: body.to_owned(),
            kind: MessageKind::Text,
            has_media: false,
            is_ephemeral: false,
            timestamp: None,
            is_quoted_reply: false,
            quoted: None,
        }
    }

    /// Whether this is an ephemeral media message worth capturing.
    pub fn is_capturable(&self) -> bool {
        self.has_media && self.kind != MessageKind::Sticker && self.is_ephemeral
    }

    /// Whether the message originates from the status broadcast channel.
    pub fn is_status_broadcast(&self) -> bool {
        self.chat_id == STATUS_BROADCAST
    }
}

/// A group or direct chat snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: String,
    /// Whether this chat is a group.
    pub is_group: bool,
    /// Roster in platform order; empty for direct chats.
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// A group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Serialized participant id (e.g. `15551234567@c.us`).
    pub id: String,
    /// Handle rendered after `@` in mention text (the user part of the id).
    pub display_handle: String,
    /// Group admin flag.
    #[serde(default)]
    pub is_admin: bool,
    /// Group owner flag.
    #[serde(default)]
    pub is_super_admin: bool,
}

impl Participant {
    /// Admins and super-admins both count as admins.
    pub fn has_admin_role(&self) -> bool {
        self.is_admin || self.is_super_admin
    }
}

/// Address book entry for a participant or sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Serialized contact id.
    pub id: String,
    /// Name saved in the operator's address book.
    #[serde(default)]
    pub name: Option<String>,
    /// Name the contact set for themselves.
    #[serde(default)]
    pub pushname: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub number: Option<String>,
}

impl Contact {
    /// Name used for matching: saved name, else pushname, else number.
    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
            .or_else(|| non_empty(self.pushname.as_deref()))
            .or_else(|| non_empty(self.number.as_deref()))
    }

    /// Name used in archive records: saved name, else pushname.
    pub fn friendly_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.pushname.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Opaque media payload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Original filename, if any.
    pub filename: Option<String>,
}

impl std::fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAsset")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("filename", &self.filename)
            .finish()
    }
}

/// Per-send options understood by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendOptions {
    /// Participant ids mentioned by the text.
    pub mentions: Vec<String>,
    /// Deliver the media as a sticker.
    pub send_as_sticker: bool,
    /// Sticker pack name.
    pub sticker_name: Option<String>,
    /// Sticker author.
    pub sticker_author: Option<String>,
    /// Caption shown under media.
    pub caption: Option<String>,
    /// Message this send replies to.
    pub quoted_message_id: Option<String>,
}

/// A single request to send text and/or media to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundAction {
    /// Destination chat id.
    pub destination: String,
    /// Text body.
    pub text: Option<String>,
    /// Media payload.
    pub media: Option<MediaAsset>,
    /// Send options.
    pub options: SendOptions,
}

impl OutboundAction {
    /// Plain text to a chat.
    pub fn text(destination: &str, text: impl Into<String>) -> Self {
        Self {
            destination: destination.to_owned(),
            text: Some(text.into()),
            media: None,
            options: SendOptions::default(),
        }
    }

    /// Text reply to a specific message in its chat.
    pub fn reply(to: &Message, text: impl Into<String>) -> Self {
        let mut action = Self::text(&to.chat_id, text);
        action.options.quoted_message_id = Some(to.id.clone());
        action
    }

    /// Media to a chat, with an optional caption.
    pub fn media(destination: &str, media: MediaAsset, caption: Option<&str>) -> Self {
        Self {
            destination: destination.to_owned(),
            text: None,
            media: Some(media),
            options: SendOptions {
                caption: caption.map(str::to_owned),
                ..SendOptions::default()
            },
        }
    }
}
