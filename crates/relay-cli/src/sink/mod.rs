//! Outbound sinks.
//!
//! `http` posts each change to the collector in the background; `stdout`
//! writes one JSON line per change and is used by `replay`.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod http;
pub mod stdout;

pub use http::HttpSink;
pub use stdout::StdoutSink;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("collector answered {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub struct DeliveryReport {
    pub namespace: String,
    pub key: String,
    pub outcome: Result<(), DeliveryError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub delivered: u64,
    pub failed: u64,
    /// Requests still in flight when the drain window closed.
    pub aborted: u64,
    /// Deliveries refused because the pending limit was reached.
    pub dropped: u64,
}

/// Consume reports until every sender is gone. Failures are logged here and
/// nowhere else.
pub(crate) fn spawn_reporter(mut rx: mpsc::UnboundedReceiver<DeliveryReport>) -> JoinHandle<SinkStats> {
    tokio::spawn(async move {
        let mut stats = SinkStats::default();
        while let Some(report) = rx.recv().await {
            match report.outcome {
                Ok(()) => {
                    stats.delivered += 1;
                    tracing::debug!(key = %report.key, namespace = %report.namespace, "delivered");
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(key = %report.key, namespace = %report.namespace, error = %e, "change not delivered");
                }
            }
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reporter_counts_outcomes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(rx);

        for outcome in [Ok(()), Err(DeliveryError::Status(500)), Ok(())] {
            tx.send(DeliveryReport {
                namespace: "ns".into(),
                key: "/a/b".into(),
                outcome,
            })
            .unwrap();
        }
        drop(tx);

        let stats = reporter.await.unwrap();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.aborted, 0);
    }
}
