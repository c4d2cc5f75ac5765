use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use settings_relay_core::catalog::{CatalogLoad, SchemaCatalog};

/// Read and parse the schema registry. Any failure here is fatal.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogLoad> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read schema registry {}", path.display()))?;
    let load = SchemaCatalog::from_json_str(&raw).map_err(|e| anyhow!("{}: {e}", path.display()))?;

    tracing::info!(
        registry = %path.display(),
        fixed = load.catalog.fixed_len(),
        relocatable = load.catalog.relocatable_len(),
        skipped = load.skipped.len(),
        "schema registry loaded"
    );
    Ok(load)
}
