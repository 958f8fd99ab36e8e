//! Vercetti CLI entry point.
//!
//! Provides `start`, `setup`, and `status` subcommands for running the bot,
//! linking a WhatsApp account through the bridge sidecar, and checking the
//! bridge connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use vercetti::config::{runtime_paths, Config};
use vercetti::pipeline::router::Router;
use vercetti::pipeline::runner::run_event_loop;
use vercetti::pipeline::transformer::ContentTransformer;
use vercetti::transport::TransportPort;
use vercetti::types::ChatEvent;
use vercetti::whatsapp::client::WhatsAppClient;
use vercetti::whatsapp::{events, setup};

/// WhatsApp group helper bot.
#[derive(Parser)]
#[command(name = "vercetti", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the bot until Ctrl+C.
    Start,
    /// Start the bridge sidecar and write the login QR code to disk.
    Setup {
        /// Where to write the QR code PNG.
        #[arg(long, default_value = "vercetti-qr.png")]
        qr_out: PathBuf,
    },
    /// Show the bridge connection state.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = runtime_paths()?;
    if paths.env_file.exists() {
        dotenvy::from_path(&paths.env_file)
            .with_context(|| format!("failed to load {}", paths.env_file.display()))?;
    }
    dotenvy::dotenv().ok();

    match cli.command {
        Command::Start => handle_start(&paths.logs_dir).await,
        Command::Setup { qr_out } => handle_setup(&qr_out).await,
        Command::Status => handle_status().await,
    }
}

/// Run the bot: listener -> channel -> router, until Ctrl+C.
async fn handle_start(logs_dir: &std::path::Path) -> anyhow::Result<()> {
    let _logging_guard = vercetti::logging::init_production(logs_dir)?;
    let config = Config::load().context("failed to load configuration")?;

    info!(bridge = %config.bridge.base_url, "vercetti starting");

    let client = Arc::new(WhatsAppClient::new(&config.bridge));
    client
        .wait_healthy()
        .await
        .with_context(|| format!("bridge not reachable at {}", client.base_url()))?;

    let (event_tx, event_rx) = mpsc::channel::<ChatEvent>(config.runtime.channel_buffer_size);
    let listener = events::spawn_event_listener(
        client.base_url().to_owned(),
        config.bridge.poll_timeout_secs,
        event_tx,
    );

    let transport: Arc<dyn TransportPort> = client;
    let router = Router::new(transport, ContentTransformer::new(config.sticker.clone()));

    info!("vercetti ready, listening for events");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    let summary = run_event_loop(
        router,
        event_rx,
        shutdown,
        Duration::from_secs(config.runtime.shutdown_timeout_secs),
    )
    .await;

    listener.abort();
    info!(
        events = summary.events,
        abandoned = summary.abandoned,
        "vercetti shut down"
    );
    Ok(())
}

/// Ensure the bridge sidecar is running and write the QR code.
async fn handle_setup(qr_out: &std::path::Path) -> anyhow::Result<()> {
    vercetti::logging::init_cli();
    let config = Config::load().context("failed to load configuration")?;

    let docker = bollard::Docker::connect_with_local_defaults()
        .context("failed to connect to Docker")?;
    setup::setup_qr(&docker, &config.bridge, &config.sidecar, qr_out)
        .await
        .context("bridge setup failed")?;

    println!(
        "QR code written to {}. Open WhatsApp > Linked devices and scan it.",
        qr_out.display()
    );
    Ok(())
}

/// Print the bridge connection state.
async fn handle_status() -> anyhow::Result<()> {
    vercetti::logging::init_cli();
    let config = Config::load().context("failed to load configuration")?;

    let client = WhatsAppClient::new(&config.bridge);
    if !client.is_reachable().await {
        println!("Bridge: not reachable at {}", client.base_url());
        return Ok(());
    }

    let status = client.status().await.context("failed to read bridge status")?;
    println!("Bridge: {}", client.base_url());
    println!(
        "WhatsApp: {}",
        if status.connected {
            "connected"
        } else {
            "not linked (run `vercetti setup`)"
        }
    );
    if let Some(wid) = status.wid {
        println!("Account: {wid}");
    }
    if let Some(phone) = status.phone_number {
        println!("Phone: {phone}");
    }
    Ok(())
}
