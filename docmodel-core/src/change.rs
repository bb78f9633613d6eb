//! Change detection against the persisted copy of a document.
//!
//! There is no local dirty-bit bookkeeping: a change check reads the stored record and
//! compares it field by field with the in-memory state. That costs one query per check.
//! The read sits behind [`ChangeTracker`] so a class can swap in another strategy without
//! touching callers.

use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use std::fmt::Debug;

use crate::{
    collection::CollectionHandle,
    error::{DocumentError, DocumentResult},
    id::ID_FIELD,
};

/// Computes which in-memory fields differ from the stored record.
#[async_trait]
pub trait ChangeTracker: Send + Sync + Debug {
    /// Returns the fields of `fields` whose values differ from the record stored under
    /// `id`, mapped to their in-memory values. `_id` is never reported.
    async fn diff(
        &self,
        collection: &CollectionHandle,
        id: &ObjectId,
        fields: &Document,
    ) -> DocumentResult<Document>;
}

/// Reads the stored record and compares it with the in-memory fields.
///
/// A field counts as changed when the stored record lacks it or holds a different value.
/// A missing record therefore reports every field.
#[derive(Debug, Default, Clone, Copy)]
pub struct PersistedDiff;

#[async_trait]
impl ChangeTracker for PersistedDiff {
    async fn diff(
        &self,
        collection: &CollectionHandle,
        id: &ObjectId,
        fields: &Document,
    ) -> DocumentResult<Document> {
        let persisted = collection
            .find_one(doc! { ID_FIELD: *id })
            .await?;

        Ok(fields
            .iter()
            .filter(|(key, _)| key.as_str() != ID_FIELD)
            .filter(|(key, value)| {
                persisted
                    .as_ref()
                    .and_then(|record| record.get(key.as_str()))
                    != Some(*value)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Outcome of a change check.
///
/// Separates "nothing changed" from "the check itself failed", which the plain
/// `has_changed` mapping cannot tell apart.
#[derive(Debug)]
pub enum ChangeSet {
    /// The document has no identifier yet; every field is new.
    New(Document),
    /// The document is persisted and these fields differ from the stored copy.
    Modified(Document),
    /// The document matches the stored copy.
    Unchanged,
    /// The stored copy could not be read, so nothing is known.
    Unverified(DocumentError),
}

impl ChangeSet {
    /// Returns true if the check completed.
    pub fn is_verified(&self) -> bool {
        !matches!(self, ChangeSet::Unverified(_))
    }

    /// The changed fields. Empty for [`ChangeSet::Unchanged`] and [`ChangeSet::Unverified`].
    pub fn into_fields(self) -> Document {
        match self {
            ChangeSet::New(fields) | ChangeSet::Modified(fields) => fields,
            ChangeSet::Unchanged | ChangeSet::Unverified(_) => Document::new(),
        }
    }
}
