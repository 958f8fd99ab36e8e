//! Command router: classifies each chat event and drives the pipeline.
//!
//! Every text command and the implicit view-once capture run as separate
//! branches. A branch's failure is settled in one place ([`reply_for`] plus a
//! log line) and never stops the other branches of the same event.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::archiver::AuditArchiver;
use super::commands::{
    self, Command, ADMINS_HEADER, GROUP_ONLY_REPLY, LOOKUP_ERROR_REPLY,
    STICKER_ERROR_REPLY, STICKER_USAGE_REPLY, TAG_ALL_HEADER, VIEW_ONCE_CAPTION,
};
use super::resolver::{self, Filter};
use super::transformer::ContentTransformer;
use super::{Outbox, PipelineError};
use crate::transport::{TransportError, TransportPort};
use crate::types::{ChatEvent, ConnectionLifecycle, Message, OutboundAction};

/// Routes chat events to command handlers.
///
/// Cheap to clone; holds no mutable state, so clones can process different
/// events concurrently.
#[derive(Clone)]
pub struct Router {
    transport: Arc<dyn TransportPort>,
    transformer: ContentTransformer,
    archiver: AuditArchiver,
}

impl Router {
    /// Create a router sending through `transport`.
    pub fn new(transport: Arc<dyn TransportPort>, transformer: ContentTransformer) -> Self {
        Self {
            transport,
            transformer,
            archiver: AuditArchiver,
        }
    }

    /// Process one event.
    ///
    /// Actions are dispatched as they are produced; the returned list holds
    /// the ones that were delivered, in order.
    pub async fn route(&self, event: ChatEvent) -> Vec<OutboundAction> {
        match event {
            ChatEvent::IncomingMessage(msg) => self.handle_message(&msg).await,
            ChatEvent::MessageRevoked { before } => self.handle_revoke(before).await,
            ChatEvent::Lifecycle(lifecycle) => {
                log_lifecycle(&lifecycle);
                Vec::new()
            }
        }
    }

    async fn handle_message(&self, msg: &Message) -> Vec<OutboundAction> {
        if msg.is_status_broadcast() {
            return Vec::new();
        }

        let mut outbox = Outbox::new(self.transport.as_ref());

        if let Some(command) = Command::parse(&msg.body) {
            debug!(command = command.name(), message_id = %msg.id, chat = %msg.chat_id, "command received");
            let result = self.run_command(&command, msg, &mut outbox).await;
            settle(&command, msg, result, &mut outbox).await;
        }

        if msg.is_capturable() {
            if let Err(e) = self.capture(msg, &mut outbox).await {
                warn!(message_id = %msg.id, error = %e, "view once capture failed");
            }
        }

        outbox.into_sent()
    }

    async fn run_command(
        &self,
        command: &Command,
        msg: &Message,
        outbox: &mut Outbox<'_>,
    ) -> Result<(), PipelineError> {
        match command {
            Command::Help => {
                outbox
                    .send(OutboundAction::reply(msg, commands::help_text()))
                    .await
            }
            Command::Sticker => self.sticker(msg, outbox).await,
            Command::TagAll => {
                self.broadcast(msg, &Filter::All, TAG_ALL_HEADER, outbox)
                    .await
            }
            Command::Admins => {
                self.broadcast(msg, &Filter::AdminOnly, ADMINS_HEADER, outbox)
                    .await
            }
            Command::Tag(fragment) => {
                let header = commands::matches_header(fragment);
                self.broadcast(msg, &Filter::NameMatch(fragment.clone()), &header, outbox)
                    .await
            }
        }
    }

    /// Mention the selected participants of the message's group.
    async fn broadcast(
        &self,
        msg: &Message,
        filter: &Filter,
        header: &str,
        outbox: &mut Outbox<'_>,
    ) -> Result<(), PipelineError> {
        let chat = self
            .transport
            .get_chat(&msg.chat_id)
            .await
            .map_err(PipelineError::Lookup)?;
        if !chat.is_group {
            return Err(PipelineError::Scope);
        }

        let resolution =
            resolver::resolve(&chat.participants, filter, self.transport.as_ref()).await;

        // Only `!tag` answers an empty selection; the others post the bare header.
        if resolution.is_empty() {
            if let Filter::NameMatch(fragment) = filter {
                return outbox
                    .send(OutboundAction::reply(msg, commands::no_match_reply(fragment)))
                    .await;
            }
            debug!(chat = %chat.id, ?filter, "nobody selected, sending header only");
        }

        let mut action = OutboundAction::text(&chat.id, resolution.render(header));
        action.options.mentions = resolution.mention_ids;
        outbox.send(action).await
    }

    /// Turn the quoted image/video into a sticker.
    async fn sticker(&self, msg: &Message, outbox: &mut Outbox<'_>) -> Result<(), PipelineError> {
        if !msg.is_quoted_reply {
            return outbox
                .send(OutboundAction::reply(msg, STICKER_USAGE_REPLY))
                .await;
        }

        let fetched;
        let quoted = match msg.quoted.as_deref() {
            Some(quoted) => Some(quoted),
            None => {
                fetched = self
                    .transport
                    .quoted_message(&msg.id)
                    .await
                    .map_err(PipelineError::Lookup)?;
                fetched.as_ref()
            }
        };
        let Some(quoted) = quoted.filter(|q| q.has_media) else {
            return outbox
                .send(OutboundAction::reply(msg, STICKER_USAGE_REPLY))
                .await;
        };

        let media = download(self.transport.as_ref(), &quoted.id).await?;
        let sticker = self.transformer.to_sticker(media)?;
        outbox.send(sticker.into_action(&msg.chat_id)).await?;
        info!(message_id = %msg.id, chat = %msg.chat_id, "sticker sent");
        Ok(())
    }

    /// Resend a view-once payload to the chat it came from.
    async fn capture(&self, msg: &Message, outbox: &mut Outbox<'_>) -> Result<(), PipelineError> {
        info!(message_id = %msg.id, chat = %msg.chat_id, "view once message received");
        let media = download(self.transport.as_ref(), &msg.id).await?;
        let media = self.transformer.capture_ephemeral(media)?;
        outbox
            .send(OutboundAction::media(
                &msg.chat_id,
                media,
                Some(VIEW_ONCE_CAPTION),
            ))
            .await?;
        info!(message_id = %msg.id, "view once media resent");
        Ok(())
    }

    async fn handle_revoke(&self, before: Option<Message>) -> Vec<OutboundAction> {
        let Some(revoked) = before else {
            debug!("revoked message without prior content, ignoring");
            return Vec::new();
        };

        let mut outbox = Outbox::new(self.transport.as_ref());
        if let Err(e) = self
            .archiver
            .archive(&revoked, self.transport.as_ref(), &mut outbox)
            .await
        {
            warn!(message_id = %revoked.id, error = %e, "archiving deleted message failed");
        }
        outbox.into_sent()
    }
}

async fn download(
    transport: &dyn TransportPort,
    message_id: &str,
) -> Result<crate::types::MediaAsset, PipelineError> {
    transport
        .download_media(message_id)
        .await
        .map_err(PipelineError::Download)?
        .ok_or_else(|| PipelineError::Download(TransportError::NotFound(message_id.to_owned())))
}

/// Log a failed command and send its best-effort reply.
async fn settle(
    command: &Command,
    msg: &Message,
    result: Result<(), PipelineError>,
    outbox: &mut Outbox<'_>,
) {
    let Err(error) = result else {
        return;
    };
    if matches!(error, PipelineError::Scope) {
        debug!(command = command.name(), chat = %msg.chat_id, "group command outside a group");
    } else {
        warn!(command = command.name(), message_id = %msg.id, error = %error, "command failed");
    }
    if let Some(reply) = reply_for(command, &error) {
        outbox
            .send_best_effort(OutboundAction::reply(msg, reply))
            .await;
    }
}

/// User-visible reply for a failed command, if the failure deserves one.
pub fn reply_for(command: &Command, error: &PipelineError) -> Option<&'static str> {
    match error {
        PipelineError::Scope => Some(GROUP_ONLY_REPLY),
        PipelineError::Download(_) | PipelineError::Transform(_) => {
            matches!(command, Command::Sticker).then_some(STICKER_ERROR_REPLY)
        }
        PipelineError::Lookup(_) => Some(LOOKUP_ERROR_REPLY),
        PipelineError::Send(_) => None,
    }
}

fn log_lifecycle(lifecycle: &ConnectionLifecycle) {
    match lifecycle {
        ConnectionLifecycle::Qr { code } => {
            info!(%code, "scan this QR code with WhatsApp to log in (or run `vercetti setup`)");
        }
        ConnectionLifecycle::Loading { percent, message } => {
            info!(percent, %message, "loading chats");
        }
        ConnectionLifecycle::Ready => info!("client is ready"),
        ConnectionLifecycle::AuthFailure { reason } => {
            error!(%reason, "authentication failure");
        }
        ConnectionLifecycle::Disconnected { reason } => {
            warn!(%reason, "client was logged out");
        }
    }
}
