//! Bridge sidecar setup: container lifecycle and QR code linking.
//!
//! Runs the WhatsApp Web bridge as a Docker container bound to localhost,
//! with its browser session kept in a named volume so a linked login
//! survives restarts.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::client::WhatsAppClient;
use super::WhatsAppError;
use crate::config::{BridgeConfig, SidecarConfig};

/// Container name for the bridge sidecar.
pub const CONTAINER_NAME: &str = "vercetti-whatsapp-bridge";

/// Port the bridge listens on inside the container.
pub const BRIDGE_PORT: u16 = 3001;

/// Named volume holding the bridge's session data.
pub const SESSION_VOLUME: &str = "vercetti-session";

/// Session directory inside the container.
pub const SESSION_MOUNT: &str = "/data/session";

/// Bytes per megabyte for the container memory limit.
const BYTES_PER_MB: i64 = 1_048_576;

/// Host port the bridge should be published on, taken from the configured URL.
pub fn host_port(bridge: &BridgeConfig) -> u16 {
    reqwest::Url::parse(&bridge.base_url)
        .ok()
        .and_then(|url| url.port_or_known_default())
        .unwrap_or(BRIDGE_PORT)
}

/// What Docker knows about the bridge container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Exists and is running.
    Running,
    /// Exists but is stopped.
    Stopped,
    /// Not created yet.
    Missing,
}

/// Bring the bridge container to the running state.
///
/// A stopped container is restarted as is; a missing one is pulled, created
/// and then started.
///
/// # Errors
///
/// Returns [`WhatsAppError::SetupFailed`] if Docker refuses any step.
pub async fn ensure_container(
    docker: &Docker,
    sidecar: &SidecarConfig,
    host_port: u16,
) -> Result<(), WhatsAppError> {
    match container_state(docker).await? {
        ContainerState::Running => {
            info!(container = CONTAINER_NAME, "bridge sidecar already running");
            Ok(())
        }
        ContainerState::Stopped => start_container(docker).await,
        ContainerState::Missing => {
            pull_image(docker, &sidecar.image).await;
            docker
                .create_container(
                    Some(CreateContainerOptions {
                        name: CONTAINER_NAME.to_owned(),
                        platform: None,
                    }),
                    bridge_container_config(sidecar, host_port),
                )
                .await
                .map_err(|e| setup_failed("create container", &e))?;
            info!(container = CONTAINER_NAME, image = %sidecar.image, host_port, "bridge sidecar created");
            start_container(docker).await
        }
    }
}

async fn container_state(docker: &Docker) -> Result<ContainerState, WhatsAppError> {
    match docker.inspect_container(CONTAINER_NAME, None).await {
        Ok(details) => {
            let running = details.state.and_then(|s| s.running).unwrap_or(false);
            Ok(if running {
                ContainerState::Running
            } else {
                ContainerState::Stopped
            })
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(ContainerState::Missing),
        Err(e) => Err(setup_failed("inspect container", &e)),
    }
}

async fn start_container(docker: &Docker) -> Result<(), WhatsAppError> {
    docker
        .start_container(CONTAINER_NAME, None::<StartContainerOptions<String>>)
        .await
        .map_err(|e| setup_failed("start container", &e))?;
    info!(container = CONTAINER_NAME, "bridge sidecar started");
    Ok(())
}

/// Pull progress errors are logged; a failed pull surfaces on create.
async fn pull_image(docker: &Docker, image: &str) {
    let mut progress = docker.create_image(
        Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        }),
        None,
        None,
    );
    while let Some(step) = progress.next().await {
        if let Err(e) = step {
            warn!(image, error = %e, "bridge image pull reported an error");
        }
    }
    info!(image, "bridge image pulled");
}

/// Container definition for the bridge: port published on localhost only,
/// session kept in [`SESSION_VOLUME`], memory capped, restarted on failure.
pub fn bridge_container_config(sidecar: &SidecarConfig, host_port: u16) -> ContainerConfig<String> {
    let port_key = format!("{BRIDGE_PORT}/tcp");
    let binding = PortBinding {
        host_ip: Some("127.0.0.1".to_owned()),
        host_port: Some(host_port.to_string()),
    };

    ContainerConfig {
        image: Some(sidecar.image.clone()),
        labels: Some(HashMap::from([("vercetti".to_owned(), "true".to_owned())])),
        exposed_ports: Some(HashMap::from([(port_key.clone(), HashMap::new())])),
        host_config: Some(HostConfig {
            port_bindings: Some(HashMap::from([(port_key, Some(vec![binding]))])),
            binds: Some(vec![format!("{SESSION_VOLUME}:{SESSION_MOUNT}")]),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::ON_FAILURE),
                maximum_retry_count: Some(5),
            }),
            memory: Some(i64::from(sidecar.memory_limit_mb).saturating_mul(BYTES_PER_MB)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn setup_failed(step: &str, error: &bollard::errors::Error) -> WhatsAppError {
    WhatsAppError::SetupFailed(format!("failed to {step}: {error}"))
}

/// Decode the bridge's base64 QR payload into PNG bytes.
///
/// Accepts both bare base64 and `data:image/png;base64,` URLs.
///
/// # Errors
///
/// Returns [`WhatsAppError::SetupFailed`] if the payload is not valid base64.
pub fn decode_qr_png(payload: &str) -> Result<Vec<u8>, WhatsAppError> {
    let encoded = payload
        .split_once("base64,")
        .map_or(payload, |(_, data)| data)
        .trim();
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| WhatsAppError::SetupFailed(format!("QR payload is not base64: {e}")))
}

/// Run the linking flow: ensure the container, wait for it, write the QR PNG.
///
/// # Errors
///
/// Returns an error if the container cannot be started, the bridge never
/// becomes reachable, no QR code is offered, or the PNG cannot be written.
pub async fn setup_qr(
    docker: &Docker,
    bridge: &BridgeConfig,
    sidecar: &SidecarConfig,
    qr_out: &Path,
) -> Result<(), WhatsAppError> {
    ensure_container(docker, sidecar, host_port(bridge)).await?;

    let client = WhatsAppClient::new(bridge);
    client.wait_healthy().await?;

    let payload = client
        .get_qr()
        .await
        .map_err(|e| WhatsAppError::SetupFailed(format!("could not fetch QR code: {e}")))?;
    let png = decode_qr_png(&payload)?;
    tokio::fs::write(qr_out, png).await.map_err(|e| {
        WhatsAppError::SetupFailed(format!("failed to write {}: {e}", qr_out.display()))
    })?;
    info!(path = %qr_out.display(), "QR code written, scan it with WhatsApp > Linked devices");
    Ok(())
}
