//! Notification feed (inbound bus adapter).
//!
//! The bus side of the relay is a line-oriented stream: one JSON object per
//! dconf `Notify` signal, in arrival order:
//!
//! ```json
//! {"sender": ":1.42", "path": "/org/gnome/terminal/legacy/profiles:/:b1/", "keys": ["font"], "values": {"font": "Monospace 11"}}
//! {"path": "/org/gnome/desktop/interface/gtk-theme", "values": {"gtk-theme": "Adwaita"}}
//! ```
//!
//! The adapter runs as its own task and pushes parsed notifications onto a
//! bounded channel; the engine consumes them in a separate loop. Blank lines
//! are skipped and malformed lines are logged and dropped.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use settings_relay_core::normalize::RawNotification;

/// Channel depth between the adapter and the engine loop.
pub const FEED_QUEUE_DEPTH: usize = 1024;

#[derive(Debug, Clone)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
}

impl FeedSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) if p.as_os_str() != "-" => Self::File(p),
            _ => Self::Stdin,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub lines: u64,
    pub forwarded: u64,
    pub malformed: u64,
}

/// Parse one feed line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<RawNotification>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Start the adapter task.
pub fn spawn(source: FeedSource, tx: mpsc::Sender<RawNotification>) -> JoinHandle<Result<FeedStats>> {
    tokio::spawn(async move {
        match source {
            FeedSource::Stdin => pump(BufReader::new(tokio::io::stdin()), tx).await,
            FeedSource::File(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("could not open feed {}", path.display()))?;
                pump(BufReader::new(file), tx).await
            }
        }
    })
}

/// Forward every notification from `reader` until EOF or until the consumer
/// goes away.
pub async fn pump<R>(reader: R, tx: mpsc::Sender<RawNotification>) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("feed read error")? {
        stats.lines += 1;
        match parse_line(&line) {
            Ok(Some(raw)) => {
                if tx.send(raw).await.is_err() {
                    tracing::debug!("engine stopped; closing feed");
                    break;
                }
                stats.forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(line = stats.lines, error = %e, "dropping unparseable notification");
            }
        }
    }

    tracing::debug!(?stats, "feed finished");
    Ok(stats)
}
