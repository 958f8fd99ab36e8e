//! Event-driven command and content pipeline.
//!
//! The [`router::Router`] consumes one [`crate::types::ChatEvent`] at a time,
//! classifies it against the command grammar in [`commands`], and drives the
//! [`resolver`], [`transformer`] and [`archiver`] to produce outbound actions.
//! [`runner`] owns the event loop that feeds the router.

use tracing::{debug, warn};

use crate::transport::{TransportError, TransportPort};
use crate::types::OutboundAction;

pub mod archiver;
pub mod commands;
pub mod resolver;
pub mod router;
pub mod runner;
pub mod transformer;

use transformer::TransformError;

/// Failure of one command branch.
///
/// Each variant has a fixed handling policy applied in one place per branch
/// (see [`router::Router`]); none of them is fatal to the event or process.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A group-only command was used outside a group.
    #[error("command requires a group chat")]
    Scope,

    /// Chat, contact or quoted-message lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(#[source] TransportError),

    /// Media download failed or returned nothing.
    #[error("download failed: {0}")]
    Download(#[source] TransportError),

    /// The media payload could not be transformed.
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Outbound dispatch failed.
    #[error("send failed: {0}")]
    Send(#[source] TransportError),
}

/// Dispatches actions for a single event, in program order.
///
/// Actions go out as soon as they are pushed; the outbox only remembers the
/// ones that were delivered so the router can report them.
pub struct Outbox<'a> {
    transport: &'a dyn TransportPort,
    sent: Vec<OutboundAction>,
}

impl<'a> Outbox<'a> {
    /// Create an empty outbox writing through `transport`.
    pub fn new(transport: &'a dyn TransportPort) -> Self {
        Self {
            transport,
            sent: Vec::new(),
        }
    }

    /// Send one action now.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Send`] if the transport rejects the action.
    pub async fn send(&mut self, action: OutboundAction) -> Result<(), PipelineError> {
        self.transport
            .send(&action)
            .await
            .map_err(PipelineError::Send)?;
        debug!(
            destination = %action.destination,
            mentions = action.options.mentions.len(),
            has_media = action.media.is_some(),
            "outbound action sent"
        );
        self.sent.push(action);
        Ok(())
    }

    /// Send an action whose failure only deserves a log line.
    pub async fn send_best_effort(&mut self, action: OutboundAction) {
        if let Err(e) = self.send(action).await {
            warn!(error = %e, "best-effort send failed");
        }
    }

    /// Actions delivered so far.
    pub fn into_sent(self) -> Vec<OutboundAction> {
        self.sent
    }
}
