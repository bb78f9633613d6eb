//! Error types and result types for document operations.
//!
//! Every fallible operation in this crate returns [`DocumentResult<T>`]. The variants
//! carry the offending identifier, field, value or collection so a failing record can be
//! located without querying again.

use bson::{error::Error as BsonError, oid::ObjectId};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur while mapping documents to a store.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// No usable storage address/database pair was found by any resolution path.
    #[error("Connection error: {0}")]
    Connection(String),
    /// An operation needed a bound collection but the document class has none yet.
    #[error("Collection {0} is not available: no storage connection has been bound")]
    CollectionUnavailable(String),
    /// A supplied value failed validation for the named field.
    #[error("Invalid value for field {field}: {value}")]
    FieldValidation {
        /// The field that was being assigned.
        field: String,
        /// The rejected value, rendered as text.
        value: String,
    },
    /// The targeted document no longer exists in the collection.
    #[error("Document with _id {id} does not exist in collection {collection}")]
    DocumentNotFound {
        /// Hex form of the identifier that was looked up.
        id: String,
        /// The collection that was searched.
        collection: String,
    },
    /// An operation that needs a persisted identifier was called on an unsaved document.
    #[error("Cannot {operation} unsaved document in collection {collection}")]
    UnsavedDocument {
        /// The operation that was attempted (`reload`, `delete`).
        operation: &'static str,
        /// The collection the document belongs to.
        collection: String,
    },
    /// Conflicting or excessive construction arguments, or a copy from a foreign class.
    #[error("Construction error: {0}")]
    Construction(String),
    /// A record with the same identifier is already stored.
    #[error("Document {id} already exists in collection {collection}")]
    DocumentAlreadyExists {
        /// Hex form of the duplicated identifier.
        id: String,
        /// The collection the insert targeted.
        collection: String,
    },
    /// A batch insert stopped after some records were already stored.
    #[error("Batch insert aborted after {} record(s) were stored: {source}", inserted.len())]
    BatchAborted {
        /// Identifiers of the records stored before the batch stopped.
        inserted: Vec<ObjectId>,
        /// The error that stopped the batch.
        source: Box<DocumentError>,
    },
    /// A filter document uses an operator or shape the backend cannot evaluate.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// Serialization/deserialization error when converting between BSON and JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentError {
    /// Returns true when the error was raised by a failed storage write.
    ///
    /// Batch inserts skip records failing this way and keep going.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            DocumentError::Backend(_) | DocumentError::DocumentAlreadyExists { .. }
        )
    }
}

/// A specialized `Result` type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

impl From<BsonError> for DocumentError {
    fn from(err: BsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}
