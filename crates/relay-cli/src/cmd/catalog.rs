use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use settings_relay_core::catalog::{SchemaDef, SchemaId, SkippedSchema};

use crate::io::registry;
use crate::output;

#[derive(Debug, Serialize)]
struct SchemaOut<'a> {
    id: &'a SchemaId,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    keys: &'a BTreeSet<String>,
}

impl<'a> From<&'a SchemaDef> for SchemaOut<'a> {
    fn from(def: &'a SchemaDef) -> Self {
        Self {
            id: &def.id,
            path: def.path.as_deref(),
            keys: &def.keys,
        }
    }
}

#[derive(Debug, Serialize)]
struct Counts {
    fixed: usize,
    relocatable: usize,
    skipped: usize,
}

#[derive(Debug, Serialize)]
struct CatalogOut<'a> {
    counts: Counts,
    fixed: Vec<SchemaOut<'a>>,
    relocatable: Vec<SchemaOut<'a>>,
    skipped: &'a [SkippedSchema],
}

pub async fn run(schemas: &Path) -> Result<()> {
    let load = registry::load_catalog(schemas)?;

    output::print(&CatalogOut {
        counts: Counts {
            fixed: load.catalog.fixed_len(),
            relocatable: load.catalog.relocatable_len(),
            skipped: load.skipped.len(),
        },
        fixed: load.catalog.fixed().values().map(SchemaOut::from).collect(),
        relocatable: load.catalog.relocatable().map(SchemaOut::from).collect(),
        skipped: &load.skipped,
    })
}
