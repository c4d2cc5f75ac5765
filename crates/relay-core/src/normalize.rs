//! Notification normalization.
//!
//! The bus delivers change notifications in two shapes:
//! - `path` ends with the separator: "these keys changed under this path";
//!   the accompanying key list (possibly empty) is used as-is
//! - `path` does not end with the separator: the string is `parent + key` and
//!   the key list is irrelevant; it is split at the last separator
//!
//! Both shapes are normalized into a [`Notification`] whose `path` always ends
//! with the separator. The split is exact: nothing beyond the final separator
//! is trimmed, because the path table indexes by that exact string.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RelayError, RelayResult};

/// Hierarchical path separator.
pub const PATH_SEPARATOR: char = '/';

/// A notification as delivered by the inbound adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    /// Bus name of the writer that emitted the change, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    pub path: String,

    /// Only meaningful when `path` ends with the separator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,

    /// Typed values keyed by key name, as produced by the value encoder.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,
}

impl RawNotification {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// A normalized `(path, keys)` notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Always ends with [`PATH_SEPARATOR`].
    pub path: String,
    pub keys: BTreeSet<String>,
    pub values: BTreeMap<String, Value>,
}

impl Notification {
    /// Value carried for `key`, or JSON `null` when the encoder supplied none.
    pub fn value_of(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn absolute_key(&self, key: &str) -> String {
        absolute_key(&self.path, key)
    }
}

/// Concatenate a separator-terminated path and a key name.
pub fn absolute_key(path: &str, key: &str) -> String {
    let mut s = String::with_capacity(path.len() + key.len());
    s.push_str(path);
    s.push_str(key);
    s
}

/// Split `parent/key` at the last separator.
///
/// Returns `None` when the string has no separator or already ends with one.
pub fn split_path_key(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.rfind(PATH_SEPARATOR)?;
    let (parent, key) = raw.split_at(idx + PATH_SEPARATOR.len_utf8());
    if key.is_empty() {
        return None;
    }
    Some((parent, key))
}

/// Normalize one raw notification.
pub fn normalize(raw: RawNotification) -> RelayResult<Notification> {
    let RawNotification {
        path, keys, mut values, ..
    } = raw;

    if path.is_empty() {
        return Err(RelayError::unparseable_notification("empty path"));
    }
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(RelayError::unparseable_notification(format!(
            "path {path:?} is not absolute"
        )));
    }

    if path.ends_with(PATH_SEPARATOR) {
        let keys = keys.unwrap_or_default().into_iter().collect();
        return Ok(Notification { path, keys, values });
    }

    let (parent, key) = split_path_key(&path).ok_or_else(|| {
        RelayError::invariant(format!("absolute path {path:?} failed to split"))
    })?;

    // Encoders may key the value by the full path instead of the key name.
    if !values.contains_key(key) {
        if let Some(v) = values.remove(path.as_str()) {
            values.insert(key.to_string(), v);
        }
    }

    Ok(Notification {
        path: parent.to_string(),
        keys: BTreeSet::from([key.to_string()]),
        values,
    })
}
