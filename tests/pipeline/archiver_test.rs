//! Deleted-message archive tests, driven through the router.

use std::sync::Arc;

use chrono::TimeZone;
use vercetti::pipeline::commands::DELETED_MEDIA_CAPTION;
use vercetti::types::{ChatEvent, Message, MessageKind};

use crate::support::{image, media_message, router, text_in, MockTransport, GROUP};

const OWN_ID: &str = "15559990000@c.us";
const SENDER: &str = "15550001111@c.us";

fn revoked(before: Option<Message>) -> ChatEvent {
    ChatEvent::MessageRevoked { before }
}

#[tokio::test]
async fn deleted_text_is_archived_to_own_chat() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_contact(SENDER, Some("Alice"), None, None),
    );
    let sent = router(&transport)
        .route(revoked(Some(text_in(GROUP, "m1", "hello"))))
        .await;

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, OWN_ID);
    assert_eq!(
        sent[0].text.as_deref(),
        Some("*Deleted Message Detected!*\nFrom: Alice\nContent: hello")
    );
    assert!(sent[0].options.mentions.is_empty());
}

#[tokio::test]
async fn archive_includes_send_time_when_known() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_contact(SENDER, Some("Alice"), None, None),
    );
    let mut msg = text_in(GROUP, "m1", "hello");
    msg.timestamp = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single();

    let sent = router(&transport).route(revoked(Some(msg))).await;

    assert_eq!(
        sent[0].text.as_deref(),
        Some("*Deleted Message Detected!*\nFrom: Alice\nSent: 2024-01-02 03:04:05 UTC\nContent: hello")
    );
}

#[tokio::test]
async fn deleted_media_is_archived_after_the_text_record() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_contact(SENDER, None, Some("ali"), None)
            .with_media("m1", image(b"photo")),
    );
    let mut msg = media_message(GROUP, "m1", MessageKind::Image, false);
    msg.body = "look".to_owned();

    let sent = router(&transport).route(revoked(Some(msg))).await;

    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].text.as_deref(),
        Some("*Deleted Message Detected!*\nFrom: ali\nContent: look")
    );
    assert_eq!(sent[1].destination, OWN_ID);
    assert_eq!(sent[1].options.caption.as_deref(), Some(DELETED_MEDIA_CAPTION));
    assert_eq!(
        sent[1].media.as_ref().map(|m| m.bytes.clone()),
        Some(b"photo".to_vec())
    );
}

#[tokio::test]
async fn failed_sender_lookup_uses_raw_id() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_failing_contact(SENDER),
    );
    let sent = router(&transport)
        .route(revoked(Some(text_in(GROUP, "m1", "hi"))))
        .await;

    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].text.as_deref(),
        Some("*Deleted Message Detected!*\nFrom: 15550001111@c.us\nContent: hi")
    );
}

#[tokio::test]
async fn contact_with_only_a_number_uses_raw_id() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_contact(SENDER, None, None, Some("15550001111")),
    );
    let sent = router(&transport)
        .route(revoked(Some(text_in(GROUP, "m1", "hi"))))
        .await;

    assert!(sent[0]
        .text
        .as_deref()
        .is_some_and(|t| t.contains("From: 15550001111@c.us\n")));
}

#[tokio::test]
async fn media_download_failure_keeps_text_record() {
    let transport = Arc::new(
        MockTransport::new()
            .with_own_id(OWN_ID)
            .with_contact(SENDER, Some("Alice"), None, None)
            .with_failing_media("m1"),
    );
    let msg = media_message(GROUP, "m1", MessageKind::Image, false);

    let sent = router(&transport).route(revoked(Some(msg))).await;

    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].text.as_deref(),
        Some("*Deleted Message Detected!*\nFrom: Alice\n")
    );
}

#[tokio::test]
async fn unknown_own_id_skips_archive() {
    let transport = Arc::new(MockTransport::new().with_contact(SENDER, Some("Alice"), None, None));
    let sent = router(&transport)
        .route(revoked(Some(text_in(GROUP, "m1", "hello"))))
        .await;

    assert!(sent.is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn revoke_without_prior_content_is_ignored() {
    let transport = Arc::new(MockTransport::new().with_own_id(OWN_ID));
    let sent = router(&transport).route(revoked(None)).await;

    assert!(sent.is_empty());
    assert!(transport.contact_lookups().is_empty());
}
