//! Path resolution table.
//!
//! Tracks, for every path seen so far, which schema governs it:
//! - `Known`: fixed at startup or elected; terminal for the lifetime of the table
//! - `Undetermined`: a candidate set of relocatable schemas plus the union of
//!   key names observed changing at that path
//!
//! Invariants:
//! - candidates only shrink after the first (seeding) observation
//! - observed keys only grow
//! - a candidate set of size one never survives an `observe` call; the path is
//!   moved to `Known` within the same call
//! - an empty candidate set is an absorbing state: the path stays undetermined
//!   and silent forever
//!
//! The table is plain owned state. Callers that process notifications from
//! several workers must hold exclusive access for the duration of one
//! `observe` call; it does no I/O and never blocks.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{SchemaCatalog, SchemaId};
use crate::elimination::{self, Verdict};

/// Result of folding one observation into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    AlreadyKnown(SchemaId),
    NewlyElected(SchemaId),
    StillUndetermined,
}

impl Resolution {
    /// Schema to label events with, if the path is now known.
    pub fn schema(&self) -> Option<&SchemaId> {
        match self {
            Self::AlreadyKnown(id) | Self::NewlyElected(id) => Some(id),
            Self::StillUndetermined => None,
        }
    }
}

/// Externally visible state of one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PathState {
    Known {
        schema_id: SchemaId,
    },
    Undetermined {
        candidates: BTreeSet<SchemaId>,
        observed_keys: BTreeSet<String>,
    },
}

impl PathState {
    /// Undetermined with no candidate left.
    pub fn is_stuck(&self) -> bool {
        matches!(self, Self::Undetermined { candidates, .. } if candidates.is_empty())
    }
}

#[derive(Debug, Clone)]
struct Pending {
    candidates: BTreeSet<SchemaId>,
    observed_keys: BTreeSet<String>,
    exhaustion_logged: bool,
}

/// Path → state map seeded from a catalog snapshot.
#[derive(Debug, Clone)]
pub struct PathTable {
    catalog: Arc<SchemaCatalog>,
    elected: BTreeMap<String, SchemaId>,
    pending: BTreeMap<String, Pending>,
}

impl PathTable {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            elected: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Fold one `(path, keys)` observation into the table.
    ///
    /// `path` must already be normalized (separator-terminated).
    pub fn observe(&mut self, path: &str, keys: &BTreeSet<String>) -> Resolution {
        if let Some(schema) = self.catalog.fixed_for_path(path) {
            return Resolution::AlreadyKnown(schema.id.clone());
        }
        if let Some(id) = self.elected.get(path) {
            return Resolution::AlreadyKnown(id.clone());
        }

        let catalog = &self.catalog;
        let entry = match self.pending.entry(path.to_string()) {
            Entry::Occupied(slot) => {
                let entry = slot.into_mut();
                entry.observed_keys.extend(keys.iter().cloned());
                let removed = elimination::audit(catalog, &mut entry.candidates, keys);
                if !removed.is_empty() {
                    tracing::debug!(
                        path,
                        removed = ?removed,
                        remaining = entry.candidates.len(),
                        "eliminated candidate schemas"
                    );
                }
                entry
            }
            Entry::Vacant(slot) => {
                let candidates = elimination::seed(catalog, keys);
                tracing::debug!(path, candidates = candidates.len(), "seeded candidate schemas");
                slot.insert(Pending {
                    candidates,
                    observed_keys: keys.clone(),
                    exhaustion_logged: false,
                })
            }
        };

        match elimination::verdict(&entry.candidates) {
            Verdict::Elected(id) => {
                tracing::info!(path, schema = %id, "elected relocatable schema");
                self.pending.remove(path);
                self.elected.insert(path.to_string(), id.clone());
                Resolution::NewlyElected(id)
            }
            Verdict::Ambiguous(n) => {
                tracing::debug!(path, candidates = n, "schema still ambiguous");
                Resolution::StillUndetermined
            }
            Verdict::Exhausted => {
                if !entry.exhaustion_logged {
                    entry.exhaustion_logged = true;
                    tracing::warn!(
                        path,
                        observed = ?entry.observed_keys,
                        "no relocatable schema declares all observed keys"
                    );
                }
                Resolution::StillUndetermined
            }
        }
    }

    /// Current state of `path`, or `None` if it was never observed and is not
    /// bound to a fixed schema.
    pub fn state(&self, path: &str) -> Option<PathState> {
        if let Some(schema) = self.catalog.fixed_for_path(path) {
            return Some(PathState::Known {
                schema_id: schema.id.clone(),
            });
        }
        if let Some(id) = self.elected.get(path) {
            return Some(PathState::Known { schema_id: id.clone() });
        }
        self.pending.get(path).map(|p| PathState::Undetermined {
            candidates: p.candidates.clone(),
            observed_keys: p.observed_keys.clone(),
        })
    }

    /// Every path tracked at runtime (fixed paths excluded), in path order.
    pub fn snapshot(&self) -> BTreeMap<String, PathState> {
        let mut out = BTreeMap::new();
        for (path, id) in &self.elected {
            out.insert(path.clone(), PathState::Known { schema_id: id.clone() });
        }
        for (path, p) in &self.pending {
            out.insert(
                path.clone(),
                PathState::Undetermined {
                    candidates: p.candidates.clone(),
                    observed_keys: p.observed_keys.clone(),
                },
            );
        }
        out
    }

    pub fn elected_len(&self) -> usize {
        self.elected.len()
    }

    pub fn undetermined_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stuck_len(&self) -> usize {
        self.pending.values().filter(|p| p.candidates.is_empty()).count()
    }

    /// Release all runtime state. Fixed paths remain known.
    pub fn clear(&mut self) {
        self.elected.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::catalog::SchemaDef;

    /// Counts WARN events seen by the current subscriber.
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn keys(ks: &[&str]) -> BTreeSet<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    fn table() -> PathTable {
        let load = SchemaCatalog::from_defs([
            SchemaDef::relocatable("A", ["host", "port"]),
            SchemaDef::relocatable("B", ["host", "user"]),
            SchemaDef::fixed("org.example.Fixed", "/fixed/", ["host"]),
        ]);
        PathTable::new(Arc::new(load.catalog))
    }

    #[test]
    fn example_scenario_elects_a() {
        let mut t = table();

        assert_eq!(t.observe("/x/", &keys(&["host"])), Resolution::StillUndetermined);
        assert_eq!(
            t.state("/x/"),
            Some(PathState::Undetermined {
                candidates: [SchemaId::new("A"), SchemaId::new("B")].into(),
                observed_keys: keys(&["host"]),
            })
        );

        assert_eq!(t.observe("/x/", &keys(&["port"])), Resolution::NewlyElected("A".into()));
        assert_eq!(t.state("/x/"), Some(PathState::Known { schema_id: "A".into() }));
        assert_eq!(t.undetermined_len(), 0);

        assert_eq!(t.observe("/x/", &keys(&["anything"])), Resolution::AlreadyKnown("A".into()));
    }

    #[test]
    fn fixed_paths_never_enter_disambiguation() {
        let mut t = table();
        assert_matches!(t.observe("/fixed/", &keys(&["nope"])), Resolution::AlreadyKnown(id) if id.as_str() == "org.example.Fixed");
        assert!(t.snapshot().is_empty());
    }

    #[test]
    fn single_candidate_on_first_sight_elects_immediately() {
        let mut t = table();
        assert_eq!(t.observe("/y/", &keys(&["user"])), Resolution::NewlyElected("B".into()));
    }

    #[test]
    fn empty_keys_track_path_without_narrowing() {
        let mut t = table();
        assert_eq!(t.observe("/z/", &keys(&[])), Resolution::StillUndetermined);
        let before = t.state("/z/");
        assert_matches!(&before, Some(PathState::Undetermined { candidates, .. }) if candidates.len() == 2);

        assert_eq!(t.observe("/z/", &keys(&[])), Resolution::StillUndetermined);
        assert_eq!(t.state("/z/"), before);
    }

    #[test]
    fn exhausted_path_is_stuck_forever() {
        let mut t = table();
        assert_eq!(t.observe("/s/", &keys(&["host"])), Resolution::StillUndetermined);
        assert_eq!(t.observe("/s/", &keys(&["color"])), Resolution::StillUndetermined);
        assert!(t.state("/s/").unwrap().is_stuck());
        assert_eq!(t.stuck_len(), 1);

        // Keys every schema declares still cannot revive it.
        assert_eq!(t.observe("/s/", &keys(&["host"])), Resolution::StillUndetermined);
        assert!(t.state("/s/").unwrap().is_stuck());
        assert_matches!(t.state("/s/"), Some(PathState::Undetermined { observed_keys, .. }) if observed_keys == keys(&["color", "host"]));
    }

    #[test]
    fn unexplained_first_observation_is_stuck_immediately() {
        let mut t = table();
        assert_eq!(t.observe("/q/", &keys(&["color"])), Resolution::StillUndetermined);
        assert!(t.state("/q/").unwrap().is_stuck());
    }

    #[test]
    fn exhaustion_is_warned_once_per_path() {
        let warnings = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());

        tracing::subscriber::with_default(subscriber, || {
            let mut t = table();
            t.observe("/s/", &keys(&["color"]));
            t.observe("/s/", &keys(&["host"]));
            t.observe("/s/", &keys(&[]));
            t.observe("/q/", &keys(&["color"]));
            t.observe("/q/", &keys(&["color"]));
        });

        assert_eq!(warnings.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn paths_are_independent() {
        let mut t = table();
        t.observe("/a/", &keys(&["host"]));
        t.observe("/b/", &keys(&["color"]));
        assert_eq!(t.observe("/a/", &keys(&["user"])), Resolution::NewlyElected("B".into()));
        assert!(t.state("/b/").unwrap().is_stuck());
        assert_eq!(t.elected_len(), 1);
    }

    #[test]
    fn clear_releases_runtime_state() {
        let mut t = table();
        t.observe("/a/", &keys(&["host"]));
        t.observe("/b/", &keys(&["port"]));
        t.clear();
        assert!(t.snapshot().is_empty());
        assert!(t.state("/fixed/").is_some());
    }
}
