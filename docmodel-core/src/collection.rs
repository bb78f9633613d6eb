//! Collection handles.
//!
//! A [`CollectionHandle`] pairs a collection name with the shared backend, so the
//! lifecycle engine never has to thread the collection name through each storage call.

use bson::{Bson, Document};
use std::sync::Arc;

use crate::{
    backend::{StoreBackend, Update, UpdateOutcome},
    error::DocumentResult,
    query::FindOptions,
};

/// A named collection on a shared storage backend.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    name: String,
    backend: Arc<dyn StoreBackend>,
}

impl CollectionHandle {
    pub(crate) fn new(name: String, backend: Arc<dyn StoreBackend>) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`](crate::error::DocumentError) if the backend fails.
    pub async fn find(&self, filter: Document, options: FindOptions) -> DocumentResult<Vec<Document>> {
        self.backend
            .find(&self.name, filter, options)
            .await
    }

    /// Returns the first record matching `filter`.
    pub async fn find_one(&self, filter: Document) -> DocumentResult<Option<Document>> {
        self.backend
            .find_one(&self.name, filter)
            .await
    }

    /// Inserts one record, returning its `_id`.
    pub async fn insert_one(&self, document: Document) -> DocumentResult<Bson> {
        self.backend
            .insert_one(&self.name, document)
            .await
    }

    /// Applies a partial update to the first record matching `filter`.
    pub async fn update_one(&self, filter: Document, update: Update) -> DocumentResult<UpdateOutcome> {
        self.backend
            .update_one(&self.name, filter, update)
            .await
    }

    /// Deletes the first record matching `filter`.
    pub async fn delete_one(&self, filter: Document) -> DocumentResult<u64> {
        self.backend
            .delete_one(&self.name, filter)
            .await
    }

    /// Deletes every record matching `filter`.
    pub async fn delete_many(&self, filter: Document) -> DocumentResult<u64> {
        self.backend
            .delete_many(&self.name, filter)
            .await
    }

    /// Counts the records matching `filter`.
    pub async fn count_documents(&self, filter: Document) -> DocumentResult<u64> {
        self.backend
            .count_documents(&self.name, filter)
            .await
    }
}
