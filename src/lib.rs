//! Vercetti: a WhatsApp group helper bot.
//!
//! Mentions everyone (or admins, or people by name) in a group, turns quoted
//! media into stickers, resends view-once media before it disappears, and
//! archives deleted messages to the operator's own chat.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod transport;
pub mod types;

pub mod pipeline;
pub mod whatsapp;
