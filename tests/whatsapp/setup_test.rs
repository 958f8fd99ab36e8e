//! Sidecar setup helper tests.

use vercetti::config::{BridgeConfig, SidecarConfig};
use vercetti::whatsapp::setup::{
    bridge_container_config, decode_qr_png, host_port, BRIDGE_PORT, SESSION_MOUNT,
    SESSION_VOLUME,
};

#[test]
fn qr_payload_accepts_data_url() {
    let png = decode_qr_png("data:image/png;base64,iVBORw==").expect("decode");
    assert_eq!(png, vec![0x89, b'P', b'N', b'G']);
}

#[test]
fn qr_payload_accepts_bare_base64() {
    let png = decode_qr_png(" iVBORw== \n").expect("decode");
    assert_eq!(&png[1..], b"PNG");
}

#[test]
fn qr_payload_rejects_garbage() {
    assert!(decode_qr_png("data:image/png;base64,@@@").is_err());
}

#[test]
fn host_port_follows_bridge_url() {
    let bridge = BridgeConfig {
        base_url: "http://127.0.0.1:4100".to_owned(),
        ..BridgeConfig::default()
    };
    assert_eq!(host_port(&bridge), 4100);
    assert_eq!(host_port(&BridgeConfig::default()), BRIDGE_PORT);
}

#[test]
fn host_port_falls_back_on_unparseable_url() {
    let bridge = BridgeConfig {
        base_url: "not a url".to_owned(),
        ..BridgeConfig::default()
    };
    assert_eq!(host_port(&bridge), BRIDGE_PORT);
}

#[test]
fn bridge_container_is_published_on_localhost_with_session_volume() {
    let sidecar = SidecarConfig {
        image: "example/bridge:1.0".to_owned(),
        memory_limit_mb: 512,
    };

    let config = bridge_container_config(&sidecar, 4100);

    assert_eq!(config.image.as_deref(), Some("example/bridge:1.0"));
    let host = config.host_config.expect("host config");
    let bindings = host
        .port_bindings
        .as_ref()
        .and_then(|ports| ports.get(&format!("{BRIDGE_PORT}/tcp")))
        .cloned()
        .flatten()
        .expect("bridge port binding");
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].host_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(bindings[0].host_port.as_deref(), Some("4100"));
    assert_eq!(
        host.binds,
        Some(vec![format!("{SESSION_VOLUME}:{SESSION_MOUNT}")])
    );
    assert_eq!(host.memory, Some(512 * 1024 * 1024));
}
