//! Relay engine.
//!
//! The engine is the single context object owning everything needed to turn a
//! notification into zero or more outbound records:
//! - a shared, read-only `SchemaCatalog` snapshot (inside the path table)
//! - the `PathTable` (the only mutable state)
//! - the `Emitter` and passthrough routing
//!
//! Processing one notification:
//! 1. normalize it (unparseable notifications are dropped and counted)
//! 2. passthrough prefixes are emitted unlabelled and never tracked
//! 3. otherwise fold it into the table; if the path is known after the fold,
//!    every key of this notification is emitted under that schema
//!
//! Keys observed while a path is undetermined only feed elimination; their
//! values are never forwarded later.
//!
//! Engines are independent: no process-wide state, so tests can build as many
//! as they like.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::SchemaCatalog;
use crate::config::RelayConfig;
use crate::emitter::{Emitter, EventSink};
use crate::normalize::{normalize, Notification, RawNotification};
use crate::passthrough::Passthrough;
use crate::table::{PathTable, Resolution};

/// Counters reported at shutdown and by `replay --summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub notifications: u64,
    pub dropped: u64,
    pub emitted: u64,
    pub elections: u64,
    pub passthrough: u64,
    pub known_paths: usize,
    pub undetermined_paths: usize,
    pub stuck_paths: usize,
}

/// What happened to one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dropped,
    Passthrough { namespace: String, emitted: usize },
    Resolved { resolution: Resolution, emitted: usize },
}

impl Outcome {
    pub fn emitted(&self) -> usize {
        match self {
            Self::Dropped => 0,
            Self::Passthrough { emitted, .. } | Self::Resolved { emitted, .. } => *emitted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    table: PathTable,
    emitter: Emitter,
    passthrough: Passthrough,
    stats: EngineStats,
}

impl Engine {
    /// Engine with the default namespace and no passthrough rules.
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            table: PathTable::new(catalog),
            emitter: Emitter::default(),
            passthrough: Passthrough::default(),
            stats: EngineStats::default(),
        }
    }

    pub fn with_config(catalog: Arc<SchemaCatalog>, cfg: &RelayConfig) -> Self {
        Self {
            table: PathTable::new(catalog),
            emitter: Emitter::new(cfg.logger.namespace.clone()),
            passthrough: Passthrough::new(cfg.passthrough.clone()),
            stats: EngineStats::default(),
        }
    }

    pub fn table(&self) -> &PathTable {
        &self.table
    }

    /// Normalize and process one raw notification.
    pub fn handle_raw(&mut self, raw: RawNotification, sink: &dyn EventSink) -> Outcome {
        self.stats.notifications += 1;
        let sender = raw.sender.clone();
        match normalize(raw) {
            Ok(n) => {
                tracing::trace!(sender = sender.as_deref().unwrap_or("-"), path = %n.path, "received");
                self.process(n, sink)
            }
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(sender = ?sender, code = e.code(), error = %e, "dropping notification");
                Outcome::Dropped
            }
        }
    }

    /// Process an already normalized notification.
    pub fn handle(&mut self, n: Notification, sink: &dyn EventSink) -> Outcome {
        self.stats.notifications += 1;
        self.process(n, sink)
    }

    fn process(&mut self, n: Notification, sink: &dyn EventSink) -> Outcome {
        tracing::debug!(path = %n.path, keys = ?n.keys, "notification");

        if let Some(rule) = self.passthrough.route(&n.path) {
            let namespace = rule.namespace.clone();
            for key in &n.keys {
                self.emitter
                    .emit_unlabelled(sink, &namespace, &n.path, key, n.value_of(key));
            }
            let emitted = n.keys.len();
            self.stats.passthrough += 1;
            self.stats.emitted += emitted as u64;
            return Outcome::Passthrough { namespace, emitted };
        }

        let resolution = self.table.observe(&n.path, &n.keys);
        if matches!(resolution, Resolution::NewlyElected(_)) {
            self.stats.elections += 1;
        }

        let emitted = match resolution.schema() {
            Some(schema_id) => {
                for key in &n.keys {
                    self.emitter.emit(sink, &n.path, key, schema_id, n.value_of(key));
                }
                n.keys.len()
            }
            None => 0,
        };
        self.stats.emitted += emitted as u64;

        Outcome::Resolved { resolution, emitted }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            known_paths: self.table.elected_len() + self.table.catalog().fixed_len(),
            undetermined_paths: self.table.undetermined_len(),
            stuck_paths: self.table.stuck_len(),
            ..self.stats.clone()
        }
    }

    /// Release all tracked path state.
    pub fn reset(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::catalog::SchemaDef;
    use crate::emitter::MemorySink;
    use crate::passthrough::LIBREOFFICE_NAMESPACE;

    fn engine() -> Engine {
        let load = SchemaCatalog::from_defs([
            SchemaDef::relocatable("A", ["host", "port"]),
            SchemaDef::relocatable("B", ["host", "user"]),
            SchemaDef::fixed("org.gnome.desktop.interface", "/org/gnome/desktop/interface/", ["gtk-theme"]),
        ]);
        Engine::with_config(Arc::new(load.catalog), &RelayConfig::default())
    }

    #[test]
    fn fixed_path_emits_immediately() {
        let mut e = engine();
        let sink = MemorySink::new();

        let out = e.handle_raw(
            RawNotification::new("/org/gnome/desktop/interface/gtk-theme").with_value("gtk-theme", json!("Adwaita")),
            &sink,
        );

        assert_eq!(out.emitted(), 1);
        assert_eq!(
            sink.deliveries()[0].body,
            json!({"key": "/org/gnome/desktop/interface/gtk-theme",
                   "schema": "org.gnome.desktop.interface",
                   "value": "Adwaita"})
        );
    }

    #[test]
    fn undetermined_observations_are_silent_until_election() {
        let mut e = engine();
        let sink = MemorySink::new();

        let out = e.handle_raw(RawNotification::new("/x/host").with_value("host", json!("a")), &sink);
        assert_matches!(out, Outcome::Resolved { resolution: Resolution::StillUndetermined, emitted: 0 });
        assert!(sink.is_empty());

        let out = e.handle_raw(RawNotification::new("/x/port").with_value("port", json!(22)), &sink);
        assert_matches!(out, Outcome::Resolved { resolution: Resolution::NewlyElected(_), emitted: 1 });

        let out = e.handle_raw(RawNotification::new("/x/").with_keys(["host", "port"]), &sink);
        assert_matches!(out, Outcome::Resolved { resolution: Resolution::AlreadyKnown(_), emitted: 2 });

        let keys: Vec<String> = sink.deliveries().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["/x/port", "/x/host", "/x/port"]);
        assert_eq!(sink.deliveries()[1].body["value"], json!(null));
    }

    #[test]
    fn passthrough_bypasses_table() {
        let mut e = engine();
        let sink = MemorySink::new();

        let out = e.handle_raw(RawNotification::new("/org/libreoffice/registry/Writer/").with_keys(["Zoom"]), &sink);
        assert_matches!(out, Outcome::Passthrough { ref namespace, emitted: 1 } if namespace == LIBREOFFICE_NAMESPACE);
        assert!(e.table().snapshot().is_empty());
        assert!(sink.deliveries()[0].body.get("schema").is_none());
    }

    #[test]
    fn unparseable_notifications_are_counted_and_isolated() {
        let mut e = engine();
        let sink = MemorySink::new();

        e.handle_raw(RawNotification::new("/x/").with_keys(["host"]).with_sender(":1.7"), &sink);
        assert_eq!(
            e.handle_raw(RawNotification::new("relative").with_sender(":1.8"), &sink),
            Outcome::Dropped
        );
        e.handle_raw(RawNotification::new("/x/").with_keys(["user"]).with_sender(":1.7"), &sink);

        let stats = e.stats();
        assert_eq!(stats.notifications, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.elections, 1);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.known_paths, 2);
        assert_eq!(stats.undetermined_paths, 0);
    }

    #[test]
    fn reset_releases_state() {
        let mut e = engine();
        let sink = MemorySink::new();
        e.handle_raw(RawNotification::new("/x/").with_keys(["host"]), &sink);
        e.reset();
        assert_eq!(e.stats().undetermined_paths, 0);
    }
}
