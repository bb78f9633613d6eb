//! Main docmodel crate: active-record documents over schemaless document stores.
//!
//! This crate is the primary entry point for users of the docmodel framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! convenient access to the storage backends.
//!
//! # Features
//!
//! - **Schemaless documents** - Open, ordered field mappings with an `_id` assigned on first save
//! - **Change detection** - Diffs in-memory state against the stored record before every update
//! - **Query surface** - `find`, `find_one`, `find_by_id`, `find_in`, `all`, `delete`, `insert_many`, `document_count`
//! - **Result lists** - Filter, map, reduce, stable sort, group and random pick over query results
//! - **Class factory** - Create and register document classes at runtime
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentResult<()> {
//!     let db = Database::new("app", InMemoryStore::new());
//!     let users = DocumentClass::builder("User").bind(&db).build();
//!
//!     let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 })?;
//!     alice.save().await?;
//!
//!     alice.set("age", 19)?;
//!     assert_eq!(alice.has_changed().await, doc! { "age": 19 });
//!     alice.save().await?;
//!
//!     let adults = users
//!         .find(Filter::gte("age", 18), FindOptions::default())
//!         .await?
//!         .map(|user| user.to_dict());
//!
//!     println!("{adults:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Static models
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Model)]
//! #[model(collection = "people")]
//! struct Person;
//!
//! Person::bind(&Database::new("app", InMemoryStore::new()));
//! let mut ada = Person::new(doc! { "name": "Ada" })?;
//! ada.save().await?;
//! ```
//!
//! # Connection bootstrap
//!
//! Classes that were never bound resolve their collection through the process-wide
//! connection on first use:
//!
//! ```ignore
//! use docmodel::{connection::{self, ConnectionResolver}, memory::InMemoryConnector};
//!
//! connection::connect(&InMemoryConnector::new(), &ConnectionResolver::new()).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodel;

pub mod prelude;

pub use docmodel_core::{
    backend, capability, change, class, collection, connection, document, error, factory, id,
    model, naming, query, results, store,
};

pub use docmodel_core::{
    class::{DocumentArgs, DocumentClass, InsertManyReport, Source},
    document::{Document, FieldDeletion},
    factory::{Namespace, create_document_class},
    model::Model,
    results::ResultList,
};
pub use docmodel_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryConnector, InMemoryStore, InMemoryStoreBuilder, MEMORY_SCHEME};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbConnector, MongoDbStore, MongoDbStoreBuilder};
}
