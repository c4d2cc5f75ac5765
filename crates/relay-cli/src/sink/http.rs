//! Fire-and-forget HTTP delivery.
//!
//! `submit` spawns one POST per change and returns at once. Tasks wait on a
//! semaphore, so at most `max_in_flight` requests are open at a time while the
//! engine keeps consuming notifications. At most `max_pending` deliveries are
//! held (in flight or waiting); beyond that new ones are dropped. Failures are
//! reported and dropped; nothing is retried.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use settings_relay_core::config::{LoggerConfig, SinkConfig};
use settings_relay_core::emitter::{Delivery, EventSink};

use super::{spawn_reporter, DeliveryError, DeliveryReport, SinkStats};

pub struct HttpSink {
    client: reqwest::Client,
    logger: LoggerConfig,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    reports: mpsc::UnboundedSender<DeliveryReport>,
    reporter: JoinHandle<SinkStats>,
    accepting: AtomicBool,
    max_pending: usize,
    overflow: AtomicU64,
    drain_timeout: Duration,
}

impl HttpSink {
    /// Must be called from within a tokio runtime.
    pub fn new(logger: LoggerConfig, limits: &SinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(limits.request_timeout_ms))
            .build()
            .context("could not build HTTP client")?;

        let (reports, rx) = mpsc::unbounded_channel();
        tracing::info!(collector = %logger.base_url(), max_in_flight = limits.max_in_flight, "http sink ready");

        Ok(Self {
            client,
            logger,
            permits: Arc::new(Semaphore::new(limits.max_in_flight)),
            tasks: Mutex::new(JoinSet::new()),
            reports,
            reporter: spawn_reporter(rx),
            accepting: AtomicBool::new(true),
            max_pending: limits.max_pending,
            overflow: AtomicU64::new(0),
            drain_timeout: Duration::from_millis(limits.drain_timeout_ms),
        })
    }

    /// Requests spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Stop accepting, wait up to the drain window for open requests, abort
    /// the rest and return the delivery counters.
    pub async fn shutdown(self) -> SinkStats {
        let Self {
            tasks,
            reports,
            reporter,
            accepting,
            overflow,
            drain_timeout,
            ..
        } = self;
        accepting.store(false, Ordering::SeqCst);

        let mut tasks = match tasks.into_inner() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };

        let drained = tokio::time::timeout(drain_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        let aborted = tasks.len() as u64;
        if drained.is_err() {
            tracing::warn!(aborted, "drain window elapsed; aborting open requests");
            tasks.shutdown().await;
        }

        drop(reports);
        let mut stats = reporter.await.unwrap_or_default();
        stats.aborted = aborted;
        stats.dropped = overflow.into_inner();
        stats
    }
}

impl EventSink for HttpSink {
    fn submit(&self, delivery: Delivery) {
        if !self.accepting.load(Ordering::SeqCst) {
            tracing::debug!(key = %delivery.key, "sink closed; change dropped");
            return;
        }

        let url = self.logger.endpoint_for(&delivery.namespace);
        let client = self.client.clone();
        let permits = Arc::clone(&self.permits);
        let reports = self.reports.clone();

        let Ok(mut tasks) = self.tasks.lock() else {
            tracing::error!(key = %delivery.key, "sink task set poisoned; change dropped");
            return;
        };
        while tasks.try_join_next().is_some() {}
        if tasks.len() >= self.max_pending {
            let dropped = self.overflow.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(key = %delivery.key, pending = tasks.len(), dropped, "collector backlog full; change dropped");
            return;
        }

        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let outcome = post(&client, &url, &delivery).await;
            let _ = reports.send(DeliveryReport {
                namespace: delivery.namespace,
                key: delivery.key,
                outcome,
            });
        });
    }
}

async fn post(client: &reqwest::Client, url: &str, delivery: &Delivery) -> Result<(), DeliveryError> {
    let resp = client.post(url).json(&delivery.body).send().await?;
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::Status(status.as_u16()))
    }
}
