//! Database handle shared by every document class bound to the same store.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{store::Database, memory::InMemoryStore};
//!
//! let db = Database::new("app", InMemoryStore::new());
//! let users = db.collection("users");
//! ```

use std::sync::Arc;

use crate::{backend::StoreBackend, collection::CollectionHandle};

/// A cheap, clonable handle to one database on one storage backend.
///
/// Clones share the backend. This is the value the connection bootstrap caches
/// process-wide and the value injected into document classes.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    backend: Arc<dyn StoreBackend>,
}

impl Database {
    /// Creates a database handle over the given backend.
    pub fn new(name: impl Into<String>, backend: impl StoreBackend + 'static) -> Self {
        Self::from_shared(name, Arc::new(backend))
    }

    /// Creates a database handle over an already shared backend.
    pub fn from_shared(name: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self { name: name.into(), backend }
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared backend.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Gets a handle to the named collection.
    pub fn collection(&self, name: &str) -> CollectionHandle {
        CollectionHandle::new(name.to_string(), Arc::clone(&self.backend))
    }
}
