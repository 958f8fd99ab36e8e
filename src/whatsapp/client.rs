//! HTTP client for the WhatsApp Web bridge sidecar.
//!
//! All WhatsApp operations go through this client. It implements
//! [`TransportPort`] so the pipeline can use it directly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::events::{WireMedia, WireMessage};
use super::WhatsAppError;
use crate::config::BridgeConfig;
use crate::transport::{TransportError, TransportPort};
use crate::types::{Chat, Contact, MediaAsset, Message, OutboundAction, SendOptions};

/// Number of health-check retries before giving up.
const HEALTH_CHECK_RETRIES: u32 = 5;

/// Delay between health-check attempts in milliseconds.
const HEALTH_CHECK_DELAY_MS: u64 = 2000;

/// Client for the WhatsApp Web HTTP bridge.
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
}

/// Connection status from the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppStatus {
    /// Whether the bridge is logged in to WhatsApp.
    pub connected: bool,
    /// Serialized id of the linked account, if connected.
    #[serde(default)]
    pub wid: Option<String>,
    /// Phone number of the linked account, if connected.
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Response envelope from the bridge HTTP API.
#[derive(Deserialize)]
struct BridgeResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Body of `POST /send`.
#[derive(Serialize)]
struct SendRequest<'a> {
    chat_id: &'a str,
    text: Option<&'a str>,
    media: Option<WireMedia>,
    options: &'a SendOptions,
}

impl WhatsAppClient {
    /// Create a client for the bridge described by `config`.
    pub fn new(config: &BridgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Returns the base URL of the bridge.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the bridge answers at all.
    pub async fn is_reachable(&self) -> bool {
        let Ok(url) = self.endpoint(&["status"]) else {
            return false;
        };
        matches!(self.client.get(url).send().await, Ok(resp) if resp.status().is_success())
    }

    /// Wait for the bridge to become reachable, retrying with a fixed delay.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::SidecarNotRunning`] once the retries are used up.
    pub async fn wait_healthy(&self) -> Result<(), WhatsAppError> {
        for attempt in 0..HEALTH_CHECK_RETRIES {
            if self.is_reachable().await {
                return Ok(());
            }
            if attempt < HEALTH_CHECK_RETRIES.saturating_sub(1) {
                tokio::time::sleep(std::time::Duration::from_millis(HEALTH_CHECK_DELAY_MS)).await;
            }
        }
        Err(WhatsAppError::SidecarNotRunning)
    }

    /// Get the current connection status.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the bridge cannot be reached or answers
    /// without a status.
    pub async fn status(&self) -> Result<WhatsAppStatus, TransportError> {
        self.get_data(&["status"])
            .await?
            .ok_or_else(|| TransportError::Bridge("status response carried no data".to_owned()))
    }

    /// Get the login QR code as a base64 PNG.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if no QR code is available (for example
    /// because the session is already linked).
    pub async fn get_qr(&self) -> Result<String, TransportError> {
        self.get_data(&["qr"])
            .await?
            .ok_or_else(|| TransportError::Bridge("no QR code available".to_owned()))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            TransportError::Bridge(format!("invalid bridge URL {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| TransportError::Bridge(format!("bridge URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET an endpoint and unwrap the envelope.
    ///
    /// `Ok(None)` means the bridge succeeded but had nothing to return.
    async fn get_data<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, TransportError> {
        let url = self.endpoint(segments)?;
        let resp = self.client.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(segments.join("/")));
        }
        if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(TransportError::NotConnected);
        }
        let body: BridgeResponse<T> = resp
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        unwrap_envelope(body)
    }
}

fn unwrap_envelope<T>(body: BridgeResponse<T>) -> Result<Option<T>, TransportError> {
    if !body.success {
        return Err(TransportError::Bridge(
            body.error.unwrap_or_else(|| "unknown bridge error".to_owned()),
        ));
    }
    Ok(body.data)
}

#[async_trait]
impl TransportPort for WhatsAppClient {
    async fn get_chat(&self, chat_id: &str) -> Result<Chat, TransportError> {
        self.get_data(&["chats", chat_id])
            .await?
            .ok_or_else(|| TransportError::NotFound(chat_id.to_owned()))
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Contact, TransportError> {
        self.get_data(&["contacts", contact_id])
            .await?
            .ok_or_else(|| TransportError::NotFound(contact_id.to_owned()))
    }

    async fn quoted_message(&self, message_id: &str) -> Result<Option<Message>, TransportError> {
        let wire: Option<WireMessage> = self.get_data(&["messages", message_id, "quoted"]).await?;
        wire.map(Message::try_from)
            .transpose()
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn download_media(&self, message_id: &str) -> Result<Option<MediaAsset>, TransportError> {
        let wire: Option<WireMedia> = self.get_data(&["messages", message_id, "media"]).await?;
        let media = wire
            .map(MediaAsset::try_from)
            .transpose()
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        if let Some(ref m) = media {
            debug!(message_id, mime_type = %m.mime_type, len = m.bytes.len(), "media downloaded");
        }
        Ok(media)
    }

    async fn own_id(&self) -> Result<Option<String>, TransportError> {
        let status = self.status().await?;
        Ok(status.connected.then_some(status.wid).flatten())
    }

    async fn send(&self, action: &OutboundAction) -> Result<(), TransportError> {
        let url = self.endpoint(&["send"])?;
        let body = SendRequest {
            chat_id: &action.destination,
            text: action.text.as_deref(),
            media: action.media.as_ref().map(WireMedia::from),
            options: &action.options,
        };
        let resp = self.client.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body_text = resp.text().await.unwrap_or_default();
            warn!(%status, "WhatsApp send failed: {body_text}");
            return Err(if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                TransportError::NotConnected
            } else {
                TransportError::Bridge(format!("send returned {status}"))
            });
        }
        let envelope: BridgeResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        unwrap_envelope(envelope)?;
        debug!(destination = %action.destination, "message sent via WhatsApp");
        Ok(())
    }
}
