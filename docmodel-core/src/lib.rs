//! A document mapping layer that turns schemaless records into addressable documents.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Document lifecycle** ([`document`]) - Construction, change detection, save, reload and delete
//! - **Document classes** ([`class`]) - The runtime document type and its query surface
//! - **Result lists** ([`results`]) - Ordered query results with functional helpers
//! - **Class factory** ([`factory`]) - Runtime class creation into a caller-owned namespace
//! - **Static models** ([`model`]) - Statically declared document types
//! - **Capabilities** ([`capability`]) - Write hooks mixed into a class
//! - **Change detection** ([`change`]) - Diffing in-memory state against the stored record
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`]) - Filter documents, find options and filter expressions
//! - **Collections and databases** ([`collection`], [`store`]) - Handles scoped to one collection or database
//! - **Connection bootstrap** ([`connection`]) - Settings resolution and the process-wide handle
//! - **Identifiers and naming** ([`id`], [`naming`]) - `_id` parsing and collection name derivation
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{DocumentClass, Filter, FindOptions};
//! use bson::doc;
//!
//! let users = DocumentClass::builder("User").bind(&db).build();
//!
//! let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 })?;
//! alice.save().await?;
//! assert!(alice.is_saved().await);
//!
//! let adults = users.find(Filter::gte("age", 18), FindOptions::default()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod capability;
pub mod change;
pub mod class;
pub mod collection;
pub mod connection;
pub mod document;
pub mod error;
pub mod factory;
pub mod id;
pub mod model;
pub mod naming;
pub mod query;
pub mod results;
pub mod store;
