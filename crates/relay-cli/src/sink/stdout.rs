use serde::Serialize;
use serde_json::Value;

use settings_relay_core::emitter::{Delivery, EventSink};

use crate::output;

/// One emitted change as written by `replay`.
#[derive(Debug, Serialize)]
struct Line<'a> {
    namespace: &'a str,
    event: &'a Value,
}

/// Writes each delivery to stdout as a single JSON line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn submit(&self, delivery: Delivery) {
        let line = Line {
            namespace: &delivery.namespace,
            event: &delivery.body,
        };
        if let Err(e) = output::print_line(&line) {
            tracing::error!(key = %delivery.key, error = %e, "could not write change");
        }
    }
}
