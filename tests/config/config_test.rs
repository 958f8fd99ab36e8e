//! Config file loading and env override tests.

use std::collections::HashMap;
use std::io::Write;

use vercetti::config::{load_config, Config};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn full_file_is_parsed() {
    let file = write_config(
        r#"
[bridge]
base_url = "http://10.0.0.5:3001"
connect_timeout_secs = 2
request_timeout_secs = 30
poll_timeout_secs = 25

[sticker]
name = "Pack"
author = "Tommy"

[runtime]
channel_buffer_size = 16
shutdown_timeout_secs = 3

[sidecar]
image = "example/bridge:1.2"
memory_limit_mb = 512
"#,
    );

    let config = load_config(file.path()).expect("parse");

    assert_eq!(config.bridge.base_url, "http://10.0.0.5:3001");
    assert_eq!(config.bridge.connect_timeout_secs, 2);
    assert_eq!(config.bridge.request_timeout_secs, 30);
    assert_eq!(config.bridge.poll_timeout_secs, 25);
    assert_eq!(config.sticker.name, "Pack");
    assert_eq!(config.sticker.author, "Tommy");
    assert_eq!(config.runtime.channel_buffer_size, 16);
    assert_eq!(config.runtime.shutdown_timeout_secs, 3);
    assert_eq!(config.sidecar.image, "example/bridge:1.2");
    assert_eq!(config.sidecar.memory_limit_mb, 512);
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config("[sticker]\nname = \"Only name\"\n");

    let config = load_config(file.path()).expect("parse");

    assert_eq!(config.sticker.name, "Only name");
    assert_eq!(config.sticker.author, "Vercetti\u{2712}\u{FE0F}");
    assert_eq!(config.bridge.base_url, "http://127.0.0.1:3001");
    assert_eq!(config.runtime.channel_buffer_size, 64);
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = load_config(&dir.path().join("absent.toml")).expect("defaults");

    assert_eq!(config.bridge.base_url, "http://127.0.0.1:3001");
    assert_eq!(config.runtime.shutdown_timeout_secs, 10);
    assert_eq!(config.sidecar.memory_limit_mb, 1024);
}

#[test]
fn invalid_toml_is_an_error() {
    let file = write_config("[bridge\nbase_url = ");

    let err = load_config(file.path()).unwrap_err();

    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
        ("VERCETTI_BRIDGE_URL", "http://bridge.local:9000/"),
        ("VERCETTI_STICKER_NAME", "Env pack"),
        ("VERCETTI_STICKER_AUTHOR", "Env author"),
        ("VERCETTI_SHUTDOWN_TIMEOUT_SECS", "42"),
        ("VERCETTI_SIDECAR_IMAGE", "example/bridge:edge"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

    assert_eq!(config.bridge.base_url, "http://bridge.local:9000");
    assert_eq!(config.sticker.name, "Env pack");
    assert_eq!(config.sticker.author, "Env author");
    assert_eq!(config.runtime.shutdown_timeout_secs, 42);
    assert_eq!(config.sidecar.image, "example/bridge:edge");
}

#[test]
fn absent_env_leaves_config_untouched() {
    let mut config = Config::default();
    config.apply_overrides(|_| None);

    assert_eq!(config.bridge.base_url, "http://127.0.0.1:3001");
    assert_eq!(config.sticker.name, "Stickers\u{1F63C}");
}

#[test]
fn zero_limits_are_clamped() {
    let file = write_config(
        "[runtime]\nchannel_buffer_size = 0\n\n[bridge]\npoll_timeout_secs = 0\n",
    );
    let mut config = load_config(file.path()).expect("parse");

    config.clamp_limits();

    assert_eq!(config.runtime.channel_buffer_size, 1);
    assert_eq!(config.bridge.poll_timeout_secs, 1);
}

#[test]
fn nonzero_limits_are_kept() {
    let mut config = Config::default();
    config.runtime.channel_buffer_size = 8;

    config.clamp_limits();

    assert_eq!(config.runtime.channel_buffer_size, 8);
    assert_eq!(config.bridge.poll_timeout_secs, 60);
}
