//! Media transforms: sticker conversion and view-once capture.

use tracing::debug;

use crate::config::StickerConfig;
use crate::types::{MediaAsset, OutboundAction, SendOptions};

/// Why a media payload could not be transformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The MIME type cannot be turned into the requested output.
    #[error("unsupported media type: {0}")]
    UnsupportedFormat(String),

    /// The payload has no bytes.
    #[error("media payload is empty")]
    EmptyPayload,
}

/// Media tagged for sticker delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerAsset {
    /// Source image or video.
    pub media: MediaAsset,
    /// Sticker pack name.
    pub name: String,
    /// Sticker author.
    pub author: String,
}

impl StickerAsset {
    /// Outbound action delivering this sticker to `destination`.
    pub fn into_action(self, destination: &str) -> OutboundAction {
        OutboundAction {
            destination: destination.to_owned(),
            text: None,
            media: Some(self.media),
            options: SendOptions {
                send_as_sticker: true,
                sticker_name: Some(self.name),
                sticker_author: Some(self.author),
                ..SendOptions::default()
            },
        }
    }
}

/// Stateless media transformer configured with the sticker metadata.
#[derive(Debug, Clone)]
pub struct ContentTransformer {
    sticker: StickerConfig,
}

impl ContentTransformer {
    /// Create a transformer stamping stickers with the given metadata.
    pub fn new(sticker: StickerConfig) -> Self {
        Self { sticker }
    }

    /// Tag an image or video for sticker delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnsupportedFormat`] for anything that is not
    /// `image/*` or `video/*`, and [`TransformError::EmptyPayload`] for a
    /// zero-length payload.
    pub fn to_sticker(&self, media: MediaAsset) -> Result<StickerAsset, TransformError> {
        ensure_payload(&media)?;
        let mime = media.mime_type.to_ascii_lowercase();
        if !(mime.starts_with("image/") || mime.starts_with("video/")) {
            return Err(TransformError::UnsupportedFormat(media.mime_type));
        }
        debug!(mime_type = %media.mime_type, len = media.bytes.len(), "sticker prepared");
        Ok(StickerAsset {
            media,
            name: self.sticker.name.clone(),
            author: self.sticker.author.clone(),
        })
    }

    /// Pass a captured view-once payload through for resend.
    ///
    /// The payload is unchanged; a filename is derived from the MIME type
    /// when the transport did not supply one.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::EmptyPayload`] for a zero-length payload.
    pub fn capture_ephemeral(&self, mut media: MediaAsset) -> Result<MediaAsset, TransformError> {
        ensure_payload(&media)?;
        if media.filename.as_deref().map_or(true, str::is_empty) {
            media.filename = Some(format!("view-once.{}", extension_for(&media.mime_type)));
        }
        Ok(media)
    }
}

fn ensure_payload(media: &MediaAsset) -> Result<(), TransformError> {
    if media.bytes.is_empty() {
        return Err(TransformError::EmptyPayload);
    }
    Ok(())
}

/// File extension for common WhatsApp media types.
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
