//! WhatsApp adapter: HTTP bridge client, event listener, and sidecar setup.
//!
//! Talks to a WhatsApp Web bridge running in a Docker sidecar
//! (`vercetti-whatsapp-bridge`) over HTTP, and long-polls it for events.
//! Wire payloads are validated here and converted into [`crate::types`]
//! before they reach the pipeline.

pub mod client;
pub mod events;
pub mod setup;

/// Errors from the WhatsApp adapter outside the pipeline's transport calls.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// HTTP request to the sidecar failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sidecar container is not running or not reachable.
    #[error("sidecar not running")]
    SidecarNotRunning,

    /// A bridge payload failed validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Container setup or QR retrieval failed.
    #[error("setup failed: {0}")]
    SetupFailed(String),
}
