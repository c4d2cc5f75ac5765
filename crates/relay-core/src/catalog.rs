//! Schema catalog.
//!
//! The catalog is a read-only snapshot of every schema definition known to the
//! schema registry, split into two groups:
//! - fixed-path schemas, indexed by the one path they are bound to
//! - relocatable schemas, indexed by id, usable at any path
//!
//! It is built exactly once at startup and never mutated afterwards, so it can
//! be shared behind an `Arc` without synchronization.
//!
//! Registry document shape (JSON):
//!
//! ```json
//! { "schemas": [ { "id": "org.gnome.desktop.interface",
//!                  "keys": ["gtk-theme", "font-name"],
//!                  "path": "/org/gnome/desktop/interface/" },
//!                { "id": "org.gnome.Terminal.Legacy.Profile",
//!                  "keys": ["font", "use-system-font"] } ] }
//! ```
//!
//! A document that is not an object with a `schemas` array is fatal. A single
//! bad entry is skipped and reported in [`CatalogLoad::skipped`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RelayError, RelayResult};
use crate::normalize::PATH_SEPARATOR;

/// Stable schema identifier (e.g. `org.gnome.desktop.interface`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub String);

impl SchemaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single schema definition as exposed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDef {
    pub id: SchemaId,
    /// Declared key names. Ordering is irrelevant.
    pub keys: BTreeSet<String>,
    /// Bound path for fixed schemas; `None` for relocatable ones.
    pub path: Option<String>,
}

impl SchemaDef {
    pub fn relocatable<I, K>(id: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            id: SchemaId::new(id),
            keys: keys.into_iter().map(Into::into).collect(),
            path: None,
        }
    }

    pub fn fixed<I, K>(id: impl Into<String>, path: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            id: SchemaId::new(id),
            keys: keys.into_iter().map(Into::into).collect(),
            path: Some(path.into()),
        }
    }

    pub fn declares(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// A registry entry that was not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSchema {
    /// Position of the entry in the registry's `schemas` array.
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Result of building a catalog: the catalog itself plus skipped entries.
#[derive(Debug, Clone)]
pub struct CatalogLoad {
    pub catalog: SchemaCatalog,
    pub skipped: Vec<SkippedSchema>,
}

/// Read-only schema snapshot.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    fixed: BTreeMap<String, SchemaDef>,
    relocatable: BTreeMap<SchemaId, SchemaDef>,
}

impl SchemaCatalog {
    /// Parse a registry JSON document.
    pub fn from_json_str(raw: &str) -> RelayResult<CatalogLoad> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| RelayError::malformed_registry(format!("invalid json: {e}")))?;
        Self::from_json_value(&doc)
    }

    pub fn from_json_value(doc: &Value) -> RelayResult<CatalogLoad> {
        let entries = doc
            .get("schemas")
            .and_then(Value::as_array)
            .ok_or_else(|| RelayError::malformed_registry("missing `schemas` array"))?;

        let mut parsed = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match parse_entry(entry) {
                Ok(def) => parsed.push((index, def)),
                Err(reason) => {
                    let id = entry.get("id").and_then(Value::as_str).map(str::to_string);
                    tracing::warn!(index, id = ?id, %reason, "skipping malformed schema definition");
                    skipped.push(SkippedSchema { index, id, reason });
                }
            }
        }

        let mut load = Self::from_indexed_defs(parsed);
        skipped.append(&mut load.skipped);
        skipped.sort_by_key(|s| s.index);
        load.skipped = skipped;
        Ok(load)
    }

    /// Build a catalog from already-typed definitions.
    ///
    /// Duplicate ids and duplicate fixed paths keep the first definition.
    pub fn from_defs<I>(defs: I) -> CatalogLoad
    where
        I: IntoIterator<Item = SchemaDef>,
    {
        Self::from_indexed_defs(defs.into_iter().enumerate())
    }

    fn from_indexed_defs<I>(defs: I) -> CatalogLoad
    where
        I: IntoIterator<Item = (usize, SchemaDef)>,
    {
        let mut catalog = SchemaCatalog::default();
        let mut seen_ids = BTreeSet::new();
        let mut skipped = Vec::new();

        for (index, def) in defs {
            if !seen_ids.insert(def.id.clone()) {
                let reason = "duplicate schema id".to_string();
                tracing::warn!(index, id = %def.id, %reason, "skipping schema definition");
                skipped.push(SkippedSchema { index, id: Some(def.id.0), reason });
                continue;
            }

            match def.path.clone() {
                Some(path) => {
                    if catalog.fixed.contains_key(&path) {
                        let reason = format!("fixed path {path} already bound");
                        tracing::warn!(index, id = %def.id, %reason, "skipping schema definition");
                        skipped.push(SkippedSchema { index, id: Some(def.id.0), reason });
                        continue;
                    }
                    catalog.fixed.insert(path, def);
                }
                None => {
                    catalog.relocatable.insert(def.id.clone(), def);
                }
            }
        }

        CatalogLoad { catalog, skipped }
    }

    /// Fixed-path schema bound to `path`, if any.
    pub fn fixed_for_path(&self, path: &str) -> Option<&SchemaDef> {
        self.fixed.get(path)
    }

    /// All fixed-path schemas keyed by path.
    pub fn fixed(&self) -> &BTreeMap<String, SchemaDef> {
        &self.fixed
    }

    /// Relocatable schemas in id order.
    pub fn relocatable(&self) -> impl Iterator<Item = &SchemaDef> {
        self.relocatable.values()
    }

    pub fn relocatable_by_id(&self, id: &SchemaId) -> Option<&SchemaDef> {
        self.relocatable.get(id)
    }

    pub fn fixed_len(&self) -> usize {
        self.fixed.len()
    }

    pub fn relocatable_len(&self) -> usize {
        self.relocatable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.relocatable.is_empty()
    }
}

fn parse_entry(entry: &Value) -> Result<SchemaDef, String> {
    let obj = entry.as_object().ok_or("entry is not an object")?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err("empty schema id".to_string()),
        _ => return Err("missing or non-string `id`".to_string()),
    };

    let keys = match obj.get("keys") {
        Some(Value::Array(items)) => {
            let mut keys = BTreeSet::new();
            for item in items {
                let key = item.as_str().ok_or("non-string entry in `keys`")?;
                if key.is_empty() || key.contains(PATH_SEPARATOR) {
                    return Err(format!("invalid key name {key:?}"));
                }
                keys.insert(key.to_string());
            }
            keys
        }
        Some(_) => return Err("`keys` is not an array".to_string()),
        None => return Err("missing `keys`".to_string()),
    };

    let path = match obj.get("path") {
        None | Some(Value::Null) => None,
        Some(Value::String(p)) => {
            if !p.starts_with(PATH_SEPARATOR) || !p.ends_with(PATH_SEPARATOR) {
                return Err(format!("fixed path {p:?} must start and end with '{PATH_SEPARATOR}'"));
            }
            Some(p.clone())
        }
        Some(_) => return Err("`path` is not a string".to_string()),
    };

    Ok(SchemaDef {
        id: SchemaId(id),
        keys,
        path,
    })
}
