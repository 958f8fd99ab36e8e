//! Deleted-message archive to the operator's own chat.

use tracing::{debug, info, warn};

use super::commands::DELETED_MEDIA_CAPTION;
use super::{Outbox, PipelineError};
use crate::transport::TransportPort;
use crate::types::{Message, OutboundAction};

/// Forwards revoked messages to the operator's self-chat.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditArchiver;

impl AuditArchiver {
    /// Archive a revoked message.
    ///
    /// Sends the text record first and the media (if any) second, both to the
    /// operator's own id. Does nothing when the own id is unknown. A media
    /// download failure is logged and the text record still stands.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Send`] if the text record cannot be sent.
    pub async fn archive(
        &self,
        revoked: &Message,
        transport: &dyn TransportPort,
        outbox: &mut Outbox<'_>,
    ) -> Result<(), PipelineError> {
        let destination = match transport.own_id().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(message_id = %revoked.id, "own id unknown, skipping archive");
                return Ok(());
            }
            Err(e) => {
                debug!(message_id = %revoked.id, error = %e, "own id lookup failed, skipping archive");
                return Ok(());
            }
        };

        let sender_name = sender_name(revoked, transport).await;
        outbox
            .send(OutboundAction::text(
                &destination,
                build_record(revoked, &sender_name),
            ))
            .await?;
        info!(message_id = %revoked.id, chat = %revoked.chat_id, "deleted message archived");

        if revoked.has_media {
            match transport.download_media(&revoked.id).await {
                Ok(Some(media)) => {
                    outbox
                        .send_best_effort(OutboundAction::media(
                            &destination,
                            media,
                            Some(DELETED_MEDIA_CAPTION),
                        ))
                        .await;
                }
                Ok(None) => debug!(message_id = %revoked.id, "deleted media no longer available"),
                Err(e) => warn!(message_id = %revoked.id, error = %e, "could not download deleted media"),
            }
        }
        Ok(())
    }
}

async fn sender_name(revoked: &Message, transport: &dyn TransportPort) -> String {
    match transport.get_contact(&revoked.sender_id).await {
        Ok(contact) => contact
            .friendly_name()
            .map_or_else(|| revoked.sender_id.clone(), str::to_owned),
        Err(e) => {
            warn!(sender = %revoked.sender_id, error = %e, "contact lookup failed for revoked message");
            revoked.sender_id.clone()
        }
    }
}

/// Text record for a revoked message.
pub fn build_record(revoked: &Message, sender_name: &str) -> String {
    let mut text = format!("*Deleted Message Detected!*\nFrom: {sender_name}\n");
    if let Some(ts) = revoked.timestamp {
        text.push_str(&format!("Sent: {}\n", ts.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if !revoked.body.is_empty() {
        text.push_str(&format!("Content: {}", revoked.body));
    }
    text
}
