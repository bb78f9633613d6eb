//! Convenient re-exports of commonly used types from docmodel.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document classes, instances and static models
//! - Result lists and the class factory
//! - Store backends, databases and builders
//! - Filter helpers and find options
//! - Error types

pub use bson::doc;

pub use docmodel_core::{
    class::{DocumentArgs, DocumentClass, InsertManyReport, Source},
    document::{Document, FieldDeletion},
    change::{ChangeSet, ChangeTracker, PersistedDiff},
    capability::{Capability, Timestamps},
    factory::{Namespace, create_document_class},
    model::Model,
    results::ResultList,
    store::Database,
    collection::CollectionHandle,
    backend::{StoreBackend, StoreBackendBuilder, Update, UpdateOutcome},
    query::{Filter, FindOptions, Sort, SortDirection, ASCENDING, DESCENDING},
    connection::{ConnectionResolver, ConnectionSettings, Connector},
    error::{DocumentError, DocumentResult},
};
pub use docmodel_macros::Model;
