//! Error types for settings-relay-core.
//!
//! The core crate distinguishes between two kinds of failure:
//! - fatal errors (`RelayError`) returned from whole-input operations such as
//!   parsing the schema registry document or validating configuration
//! - per-item problems (one malformed schema entry, one unparseable
//!   notification) which are reported as values by the owning module and
//!   never abort processing of other items
//!
//! Error messages are stable and intended to be logged verbatim.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type RelayResult<T> = Result<T, RelayError>;

/// Fatal errors raised by core operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A caller-supplied argument or configuration value is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The schema registry document cannot be used at all.
    #[error("malformed schema registry: {0}")]
    MalformedRegistry(String),

    /// A notification does not carry a usable path.
    #[error("unparseable notification: {0}")]
    UnparseableNotification(String),

    /// An internal invariant was violated.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl RelayError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn malformed_registry(msg: impl Into<String>) -> Self {
        Self::MalformedRegistry(msg.into())
    }

    pub fn unparseable_notification(msg: impl Into<String>) -> Self {
        Self::UnparseableNotification(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Stable short code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::MalformedRegistry(_) => "malformed_registry",
            Self::UnparseableNotification(_) => "unparseable_notification",
            Self::Invariant(_) => "invariant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = RelayError::malformed_registry("missing `schemas` array");
        assert_eq!(e.to_string(), "malformed schema registry: missing `schemas` array");
        assert_eq!(e.code(), "malformed_registry");
    }
}
