//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Operator filters** - Evaluates `$eq`, `$gt`, `$in`, `$and`, `$or` and friends locally
//! - **Find options** - Projection, multi-key sorting, skip and limit
//! - **Connection bootstrap** - `memory://` connection strings via [`InMemoryConnector`]
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{DocumentClass, store::Database, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new("app", InMemoryStore::new());
//!     let users = DocumentClass::builder("User").bind(&db).build();
//!
//!     let mut alice = users.from_fields(doc! { "name": "Alice" })?;
//!     alice.save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod connector;
pub mod store;
pub mod evaluator;

pub use connector::{InMemoryConnector, MEMORY_SCHEME};
pub use store::{InMemoryStore, InMemoryStoreBuilder};
