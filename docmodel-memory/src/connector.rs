//! Connection bootstrap for the in-memory store.

use std::sync::Arc;
use async_trait::async_trait;

use docmodel_core::{
    backend::StoreBackend,
    connection::{ConnectionSettings, Connector},
    error::{DocumentError, DocumentResult},
};

use crate::store::InMemoryStore;

/// Connection string scheme accepted by [`InMemoryConnector`].
pub const MEMORY_SCHEME: &str = "memory://";

/// Connects `memory://` connection strings to a shared [`InMemoryStore`].
///
/// Every successful connect hands out the same store, so data survives reconnects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    store: InMemoryStore,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to an existing store.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> DocumentResult<Arc<dyn StoreBackend>> {
        if !settings.connection_string.starts_with(MEMORY_SCHEME) {
            return Err(DocumentError::Connection(format!(
                "unsupported connection string {}, expected {MEMORY_SCHEME}",
                settings.connection_string
            )));
        }

        Ok(Arc::new(self.store.clone()))
    }
}
