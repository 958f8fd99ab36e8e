//! Event loop feeding the router from the transport's event channel.
//!
//! Events are taken off the channel one at a time, in delivery order. Each
//! one is routed on its own task so that an event suspended on a download or
//! lookup does not hold up the next one.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::router::Router;
use crate::types::ChatEvent;

/// Outcome of a finished event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Events taken off the channel.
    pub events: usize,
    /// In-flight events dropped because the shutdown timeout expired.
    pub abandoned: usize,
}

/// Route events until the channel closes or `shutdown` resolves.
///
/// On exit, waits up to `shutdown_timeout` for in-flight events and aborts
/// whatever is still running after that.
pub async fn run_event_loop<F>(
    router: Router,
    mut events: mpsc::Receiver<ChatEvent>,
    shutdown: F,
    shutdown_timeout: Duration,
) -> RunSummary
where
    F: Future<Output = ()>,
{
    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut received: usize = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!("event channel closed");
                    break;
                };
                received = received.saturating_add(1);
                let router = router.clone();
                tasks.spawn(async move {
                    let sent = router.route(event).await;
                    debug!(actions = sent.len(), "event processed");
                });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "event task failed");
                }
            }
            () = &mut shutdown => {
                info!("shutdown requested, no longer accepting events");
                break;
            }
        }
    }

    let pending = tasks.len();
    if pending > 0 {
        info!(
            pending_events = pending,
            timeout_secs = shutdown_timeout.as_secs(),
            "waiting for in-flight events"
        );
    }
    let deadline = tokio::time::Instant::now()
        .checked_add(shutdown_timeout)
        .unwrap_or_else(tokio::time::Instant::now);
    let drained = tokio::time::timeout_at(deadline, async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "event task failed");
            }
        }
    })
    .await;

    let abandoned = if drained.is_err() {
        let remaining = tasks.len();
        warn!(
            remaining_events = remaining,
            "shutdown timeout exceeded, abandoning in-flight events"
        );
        tasks.abort_all();
        remaining
    } else {
        0
    };

    RunSummary {
        events: received,
        abandoned,
    }
}
