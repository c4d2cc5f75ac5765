//! Change emission.
//!
//! Once a path's schema is known, every changed key is packaged as a
//! [`ChangeEvent`] and handed to an [`EventSink`]. The wire shape is fixed:
//!
//! ```json
//! { "key": "/org/gnome/terminal/profiles/abc/font",
//!   "schema": "org.gnome.Terminal.Legacy.Profile",
//!   "value": "Monospace 11" }
//! ```
//!
//! Sinks must return immediately: delivery happens elsewhere (see the HTTP
//! sink in the CLI crate). There is no batching and no dedup; each call is one
//! outbound record.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SchemaId;
use crate::normalize::absolute_key;

/// Default collector namespace for schema-labelled events.
pub const DEFAULT_NAMESPACE: &str = "org.gnome.gsettings";

/// A schema-labelled change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub key: String,
    pub schema: SchemaId,
    pub value: Value,
}

/// A change under a passthrough prefix, not governed by any schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlabelledChange {
    pub key: String,
    pub value: Value,
}

/// One outbound record: the namespace selects the collector endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub namespace: String,
    /// Absolute key, kept for delivery reports.
    pub key: String,
    pub body: Value,
}

impl Delivery {
    pub fn from_event(namespace: impl Into<String>, event: &ChangeEvent) -> Self {
        Self {
            namespace: namespace.into(),
            key: event.key.clone(),
            body: serde_json::json!({
                "key": event.key,
                "schema": event.schema,
                "value": event.value,
            }),
        }
    }

    pub fn from_unlabelled(namespace: impl Into<String>, change: &UnlabelledChange) -> Self {
        Self {
            namespace: namespace.into(),
            key: change.key.clone(),
            body: serde_json::json!({
                "key": change.key,
                "value": change.value,
            }),
        }
    }
}

/// Outbound sink. `submit` must not block.
pub trait EventSink: Send + Sync {
    fn submit(&self, delivery: Delivery);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn submit(&self, delivery: Delivery) {
        (**self).submit(delivery)
    }
}

/// Sink that keeps every delivery in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn submit(&self, delivery: Delivery) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.push(delivery);
        }
    }
}

/// Builds events and forwards them to a sink.
#[derive(Debug, Clone)]
pub struct Emitter {
    namespace: String,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Emitter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Emit one schema-labelled change for `path + key`.
    pub fn emit(&self, sink: &dyn EventSink, path: &str, key: &str, schema_id: &SchemaId, value: Value) -> ChangeEvent {
        let event = ChangeEvent {
            key: absolute_key(path, key),
            schema: schema_id.clone(),
            value,
        };
        tracing::debug!(key = %event.key, schema = %event.schema, "emitting change");
        sink.submit(Delivery::from_event(self.namespace.as_str(), &event));
        event
    }

    /// Emit one unlabelled change into `namespace`.
    pub fn emit_unlabelled(&self, sink: &dyn EventSink, namespace: &str, path: &str, key: &str, value: Value) -> UnlabelledChange {
        let change = UnlabelledChange {
            key: absolute_key(path, key),
            value,
        };
        tracing::debug!(key = %change.key, namespace, "emitting passthrough change");
        sink.submit(Delivery::from_unlabelled(namespace, &change));
        change
    }
}
