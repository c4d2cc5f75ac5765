use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use settings_relay_core::engine::{Engine, EngineStats};
use settings_relay_core::table::PathState;

use crate::io::feed::{self, FeedSource, FeedStats, FEED_QUEUE_DEPTH};
use crate::io::registry;
use crate::output;
use crate::settings::{self, Overrides};
use crate::sink::StdoutSink;

#[derive(Debug, Serialize)]
struct Summary {
    feed: FeedStats,
    stats: EngineStats,
    paths: BTreeMap<String, PathState>,
}

/// Run a recorded feed through a fresh engine, writing events to stdout.
pub async fn run(schemas: &Path, feed_path: &Path, configuration: Option<&Path>, summary: bool) -> Result<()> {
    let cfg = settings::resolve(configuration, Overrides::default())?;
    let load = registry::load_catalog(schemas)?;
    let mut engine = Engine::with_config(Arc::new(load.catalog), &cfg);

    let (tx, mut rx) = mpsc::channel(FEED_QUEUE_DEPTH);
    let handle = feed::spawn(FeedSource::from_arg(Some(feed_path.to_path_buf())), tx);

    while let Some(raw) = rx.recv().await {
        engine.handle_raw(raw, &StdoutSink);
    }
    let feed_stats = handle.await.context("feed task failed")??;

    if summary {
        output::print_line(&Summary {
            feed: feed_stats,
            stats: engine.stats(),
            paths: engine.table().snapshot(),
        })?;
    }
    Ok(())
}
