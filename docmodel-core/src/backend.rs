//! Storage backend abstraction for the document mapping layer.
//!
//! This module defines the small set of primitives the lifecycle engine needs from a
//! document store: filtered finds, single inserts, partial updates, deletes and counts.
//! Indexing, replication and durability stay the backend's business.
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::{StoreBackend, Update};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = backend.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
//! backend
//!     .update_one("users", doc! { "_id": id }, Update::Set(doc! { "age": 31 }))
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{fmt::Debug, sync::Arc};

use crate::{error::DocumentResult, query::FindOptions};

/// A partial update applied to one stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite (or add) the given top-level fields.
    Set(Document),
    /// Remove the named top-level fields.
    Unset(Vec<String>),
}

impl Update {
    /// Renders the update as an operator document (`{"$set": {...}}`).
    pub fn to_document(&self) -> Document {
        let mut update = Document::new();

        match self {
            Update::Set(fields) => {
                update.insert("$set", fields.clone());
            }
            Update::Unset(fields) => {
                update.insert(
                    "$unset",
                    fields
                        .iter()
                        .map(|f| (f.clone(), Bson::String(String::new())))
                        .collect::<Document>(),
                );
            }
        }

        update
    }
}

/// Result of an update against a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of records the filter matched (0 or 1).
    pub matched: u64,
    /// Number of records actually changed.
    pub modified: u64,
}

/// Abstract interface for document storage backends.
///
/// Implementations must be thread-safe. Every method addresses a collection by name and
/// creates it on first write if the store needs that.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the records matching `filter`, honoring projection, sort, skip and limit.
    ///
    /// Records come back in store order when no sort is given.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentResult<Vec<Document>>;

    /// Returns the first record matching `filter`, if any.
    async fn find_one(&self, collection: &str, filter: Document) -> DocumentResult<Option<Document>> {
        Ok(self
            .find(collection, filter, FindOptions::builder().limit(1).build())
            .await?
            .into_iter()
            .next())
    }

    /// Inserts one record and returns its `_id`, generating one when the record has none.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<Bson>;

    /// Applies `update` to the first record matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Update,
    ) -> DocumentResult<UpdateOutcome>;

    /// Deletes the first record matching `filter`. Returns the number deleted.
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64>;

    /// Deletes every record matching `filter`. Returns the number deleted.
    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64>;

    /// Counts the records matching `filter`.
    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentResult<u64>;
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentResult<Vec<Document>> {
        (**self).find(collection, filter, options).await
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentResult<Option<Document>> {
        (**self).find_one(collection, filter).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<Bson> {
        (**self).insert_one(collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Update,
    ) -> DocumentResult<UpdateOutcome> {
        (**self).update_one(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        (**self).delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        (**self).delete_many(collection, filter).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        (**self).count_documents(collection, filter).await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentResult<Self::Backend>;
}
