use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use settings_relay_core::engine::Engine;

use crate::args::RunArgs;
use crate::io::feed::{self, FeedSource, FEED_QUEUE_DEPTH};
use crate::io::registry;
use crate::settings::{self, Overrides};
use crate::sink::HttpSink;

pub async fn run(schemas: &Path, args: RunArgs) -> Result<()> {
    let cfg = settings::resolve(
        args.configuration.as_deref(),
        Overrides {
            host: args.host.as_deref(),
            port: args.port,
            endpoint: args.endpoint.as_deref(),
        },
    )?;

    let load = registry::load_catalog(schemas)?;
    for skipped in &load.skipped {
        tracing::warn!(index = skipped.index, id = ?skipped.id, reason = %skipped.reason, "schema skipped");
    }

    let mut engine = Engine::with_config(Arc::new(load.catalog), &cfg);
    let sink = HttpSink::new(cfg.logger.clone(), &cfg.sink)?;

    let (tx, mut rx) = mpsc::channel(FEED_QUEUE_DEPTH);
    let feed = feed::spawn(FeedSource::from_arg(args.feed), tx);
    tracing::info!(collector = %cfg.logger.base_url(), "relaying notifications");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(raw) => {
                    engine.handle_raw(raw, &sink);
                }
                None => {
                    tracing::info!("feed closed");
                    break;
                }
            },
            signal = &mut shutdown => {
                tracing::info!(signal, "shutting down");
                break;
            }
        }
    }

    drop(rx);
    feed.abort();
    let feed_error = match feed.await {
        Ok(Ok(stats)) => {
            tracing::debug!(?stats, "feed stats");
            None
        }
        Ok(Err(e)) => Some(e),
        Err(e) if e.is_cancelled() => None,
        Err(e) => Some(anyhow!("feed task failed: {e}")),
    };

    tracing::debug!(pending = sink.pending(), "draining sink");
    let delivery = sink.shutdown().await;
    let stats = engine.stats();
    engine.reset();
    tracing::info!(
        notifications = stats.notifications,
        dropped = stats.dropped,
        emitted = stats.emitted,
        elections = stats.elections,
        known_paths = stats.known_paths,
        undetermined_paths = stats.undetermined_paths,
        stuck_paths = stats.stuck_paths,
        delivered = delivery.delivered,
        failed = delivery.failed,
        aborted = delivery.aborted,
        backlog_dropped = delivery.dropped,
        "relay stopped"
    );

    match feed_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = terminate => "SIGTERM",
        name = interrupt() => name,
    }
}

async fn interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not install interrupt handler");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
