//! Statically declared document types.
//!
//! A type implementing [`Model`] owns one process-wide [`DocumentClass`], usually created
//! lazily by `#[derive(Model)]`.
//!
//! ```ignore
//! use docmodel::Model;
//!
//! #[derive(Model)]
//! #[model(collection = "people")]
//! struct Person;
//!
//! Person::bind(&db);
//! let mut ada = Person::new(doc! { "name": "Ada" })?;
//! ada.save().await?;
//! ```

use bson::Document as Fields;

use crate::{
    class::{DocumentArgs, DocumentClass},
    document::Document,
    error::DocumentResult,
    store::Database,
};

/// A statically declared document type.
pub trait Model {
    /// Returns the class shared by every instance of this type.
    fn class() -> &'static DocumentClass;

    fn collection_name() -> &'static str {
        Self::class().collection_name()
    }

    /// Binds the class to `database`. Returns false if it was already bound.
    fn bind(database: &Database) -> bool {
        Self::class().bind(database)
    }

    /// Builds an instance from a field mapping.
    fn new(fields: Fields) -> DocumentResult<Document> {
        Self::class().from_fields(fields)
    }

    fn construct(args: DocumentArgs) -> DocumentResult<Document> {
        Self::class().construct(args)
    }
}
