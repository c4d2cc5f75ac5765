//! settings-relay-core
//!
//! Core primitives for settings-relay:
//! - Schema catalog (fixed-path vs relocatable schemas)
//! - Notification normalization (`parent/key` vs `path/` + key list)
//! - Relocatable schema elimination and the path resolution table
//! - Change event modelling and the outbound sink seam
//! - The `Engine` context object tying these together
//!
//! This crate performs no network or filesystem I/O.

pub mod catalog;
pub mod config;
pub mod elimination;
pub mod emitter;
pub mod engine;
pub mod errors;
pub mod normalize;
pub mod passthrough;
pub mod table;

pub use crate::errors::{RelayError, RelayResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::catalog::{CatalogLoad, SchemaCatalog, SchemaDef, SchemaId, SkippedSchema};
    pub use crate::config::{validate_config, LoggerConfig, RelayConfig, SinkConfig};
    pub use crate::emitter::{ChangeEvent, Delivery, Emitter, EventSink, MemorySink, UnlabelledChange};
    pub use crate::engine::{Engine, EngineStats, Outcome};
    pub use crate::normalize::{normalize, Notification, RawNotification, PATH_SEPARATOR};
    pub use crate::passthrough::{Passthrough, PassthroughRule};
    pub use crate::table::{PathState, PathTable, Resolution};
    pub use crate::{RelayError, RelayResult};
}
