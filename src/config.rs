//! Configuration loading.
//!
//! Loads `~/.vercetti/config.toml` (or `$VERCETTI_CONFIG_PATH`). Environment
//! variables override file values; file values override defaults. A missing
//! config file is not an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "VERCETTI_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP bridge connection settings.
    pub bridge: BridgeConfig,
    /// Sticker metadata.
    pub sticker: StickerConfig,
    /// Event loop settings.
    pub runtime: RuntimeConfig,
    /// Bridge sidecar container settings.
    pub sidecar: SidecarConfig,
}

/// Connection to the WhatsApp HTTP bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the bridge, without trailing slash.
    pub base_url: String,
    /// Connect timeout for bridge requests.
    pub connect_timeout_secs: u64,
    /// Overall timeout for regular bridge requests (media downloads included).
    pub request_timeout_secs: u64,
    /// Long-poll timeout for the event stream.
    pub poll_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
            poll_timeout_secs: 60,
        }
    }
}

/// Metadata stamped on generated stickers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StickerConfig {
    /// Sticker pack name.
    pub name: String,
    /// Sticker author.
    pub author: String,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            name: "Stickers\u{1F63C}".to_owned(),
            author: "Vercetti\u{2712}\u{FE0F}".to_owned(),
        }
    }
}

/// Event loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the event channel between listener and router.
    pub channel_buffer_size: usize,
    /// How long shutdown waits for in-flight events.
    pub shutdown_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 64,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Docker sidecar running the WhatsApp Web bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Image to pull and run.
    pub image: String,
    /// Memory limit in megabytes.
    pub memory_limit_mb: u32,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            image: "ghcr.io/vercetti/whatsapp-bridge:latest".to_owned(),
            memory_limit_mb: 1024,
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3001".to_owned()
}

impl Config {
    /// Load with precedence env > file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed,
    /// or if no config path can be determined.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path_with(|key| std::env::var(key).ok())?;
        let mut config = load_config(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.clamp_limits();
        Ok(config)
    }

    /// Raise zero-valued limits to their minimum of 1.
    ///
    /// A zero channel buffer cannot be allocated and a zero poll timeout
    /// turns the event long-poll into a busy loop.
    pub fn clamp_limits(&mut self) {
        if self.runtime.channel_buffer_size == 0 {
            warn!("runtime.channel_buffer_size must be at least 1, using 1");
            self.runtime.channel_buffer_size = 1;
        }
        if self.bridge.poll_timeout_secs == 0 {
            warn!("bridge.poll_timeout_secs must be at least 1, using 1");
            self.bridge.poll_timeout_secs = 1;
        }
    }

    /// Apply environment overrides through `env` (injectable for tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("VERCETTI_BRIDGE_URL") {
            self.bridge.base_url = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = env("VERCETTI_STICKER_NAME") {
            self.sticker.name = v;
        }
        if let Some(v) = env("VERCETTI_STICKER_AUTHOR") {
            self.sticker.author = v;
        }
        if let Some(v) = env("VERCETTI_SHUTDOWN_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.runtime.shutdown_timeout_secs = n,
                Err(_) => warn!(
                    var = "VERCETTI_SHUTDOWN_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("VERCETTI_SIDECAR_IMAGE") {
            self.sidecar.image = v;
        }
    }
}

/// Load a config file, falling back to defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            info!(path = %path.display(), "loading config from file");
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config at {}: {e}",
            path.display()
        )),
    }
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve the default config directory (`~/.vercetti/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".vercetti"))
}

/// Well-known runtime locations under the config directory.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// `~/.vercetti/.env`.
    pub env_file: PathBuf,
    /// `~/.vercetti/logs/`.
    pub logs_dir: PathBuf,
}

/// Resolve [`RuntimePaths`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    let root = config_dir()?;
    Ok(RuntimePaths {
        env_file: root.join(".env"),
        logs_dir: root.join("logs"),
    })
}
