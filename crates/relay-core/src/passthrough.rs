//! Passthrough prefixes.
//!
//! Some applications store configuration under dconf paths without any
//! GSettings schema (LibreOffice's registry mirror is the common case). Changes
//! under such a prefix skip schema resolution and are forwarded unlabelled to
//! a dedicated collector namespace.

use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, RelayResult};
use crate::normalize::PATH_SEPARATOR;

pub const LIBREOFFICE_PREFIX: &str = "/org/libreoffice/registry/";
pub const LIBREOFFICE_NAMESPACE: &str = "org.libreoffice.registry";

/// Route every path starting with `prefix` to `namespace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughRule {
    pub prefix: String,
    pub namespace: String,
}

impl PassthroughRule {
    pub fn new(prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            namespace: namespace.into(),
        }
    }

    pub fn libreoffice() -> Self {
        Self::new(LIBREOFFICE_PREFIX, LIBREOFFICE_NAMESPACE)
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn validate(&self) -> RelayResult<()> {
        if !self.prefix.starts_with(PATH_SEPARATOR) || !self.prefix.ends_with(PATH_SEPARATOR) {
            return Err(RelayError::invalid_argument(format!(
                "passthrough prefix {:?} must start and end with '{PATH_SEPARATOR}'",
                self.prefix
            )));
        }
        if self.namespace.trim().is_empty() {
            return Err(RelayError::invalid_argument("passthrough namespace must not be empty"));
        }
        Ok(())
    }
}

/// Ordered rule list; the longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct Passthrough {
    rules: Vec<PassthroughRule>,
}

impl Passthrough {
    pub fn new(rules: Vec<PassthroughRule>) -> Self {
        Self { rules }
    }

    pub fn route(&self, path: &str) -> Option<&PassthroughRule> {
        self.rules
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.prefix.len())
    }
}
