//! Document store selection. The trait and the in-memory store are
//! re-exported from `catalog-import-core`.

use anyhow::{bail, Result};
use std::sync::Arc;

pub use catalog_import_core::store::*;

use crate::config::StoreConfig;
use crate::sanity::SanityStore;

/// Instantiate the store named by `store.backend`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend.as_str() {
        "sanity" => Ok(Arc::new(SanityStore::from_config(config)?)),
        "memory" => Ok(Arc::new(memory::InMemoryStore::new())),
        other => bail!("Unknown store backend: {}", other),
    }
}
