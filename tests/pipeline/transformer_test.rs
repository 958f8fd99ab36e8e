//! Content transformer tests.

use vercetti::config::StickerConfig;
use vercetti::pipeline::transformer::{ContentTransformer, TransformError};
use vercetti::types::MediaAsset;

fn transformer() -> ContentTransformer {
    ContentTransformer::new(StickerConfig {
        name: "Pack".to_owned(),
        author: "Me".to_owned(),
    })
}

fn media(mime: &str, bytes: &[u8], filename: Option<&str>) -> MediaAsset {
    MediaAsset {
        mime_type: mime.to_owned(),
        bytes: bytes.to_vec(),
        filename: filename.map(str::to_owned),
    }
}

#[test]
fn sticker_accepts_images_and_videos() {
    for mime in ["image/jpeg", "image/webp", "video/mp4", "IMAGE/PNG"] {
        let sticker = transformer()
            .to_sticker(media(mime, b"data", None))
            .expect(mime);
        assert_eq!(sticker.name, "Pack");
        assert_eq!(sticker.author, "Me");
        assert_eq!(sticker.media.bytes, b"data".to_vec());
    }
}

#[test]
fn sticker_rejects_other_media() {
    let err = transformer()
        .to_sticker(media("application/pdf", b"%PDF", None))
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedFormat("application/pdf".to_owned())
    );
}

#[test]
fn sticker_rejects_empty_payload() {
    let err = transformer()
        .to_sticker(media("image/jpeg", b"", None))
        .unwrap_err();
    assert_eq!(err, TransformError::EmptyPayload);
}

#[test]
fn sticker_action_sets_sticker_options() {
    let action = transformer()
        .to_sticker(media("image/jpeg", b"data", None))
        .expect("sticker")
        .into_action("123@g.us");

    assert_eq!(action.destination, "123@g.us");
    assert!(action.text.is_none());
    assert!(action.options.send_as_sticker);
    assert_eq!(action.options.sticker_name.as_deref(), Some("Pack"));
    assert_eq!(action.options.sticker_author.as_deref(), Some("Me"));
    assert!(action.options.quoted_message_id.is_none());
}

#[test]
fn capture_keeps_payload_and_fills_filename() {
    let captured = transformer()
        .capture_ephemeral(media("video/mp4", b"clip", None))
        .expect("capture");
    assert_eq!(captured.bytes, b"clip".to_vec());
    assert_eq!(captured.filename.as_deref(), Some("view-once.mp4"));
}

#[test]
fn capture_keeps_existing_filename() {
    let captured = transformer()
        .capture_ephemeral(media("image/png", b"img", Some("holiday.png")))
        .expect("capture");
    assert_eq!(captured.filename.as_deref(), Some("holiday.png"));
}

#[test]
fn capture_rejects_empty_payload() {
    assert_eq!(
        transformer()
            .capture_ephemeral(media("image/png", b"", None))
            .unwrap_err(),
        TransformError::EmptyPayload
    );
}
