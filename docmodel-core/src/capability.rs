//! Extra capabilities attached to a document class.
//!
//! A capability hooks into writes. Hooks see the outgoing fields and may rewrite them;
//! the lifecycle engine mirrors their edits into the in-memory document.

use bson::{DateTime, Document};
use std::{any::Any, fmt::Debug};

use crate::error::DocumentResult;

/// Behavior mixed into a document class.
pub trait Capability: Send + Sync + Debug {
    /// Short unique name of this capability.
    fn name(&self) -> &str;

    /// Called with the full field set before a new record is inserted.
    fn before_insert(&self, _fields: &mut Document) -> DocumentResult<()> {
        Ok(())
    }

    /// Called with the changed fields before a partial update is sent.
    ///
    /// Only runs when there is something to update.
    fn before_update(&self, _changes: &mut Document) -> DocumentResult<()> {
        Ok(())
    }

    /// Returns the capability as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Stamps `created_at` on insert and `updated_at` on every update.
#[derive(Debug, Clone)]
pub struct Timestamps {
    created_field: String,
    updated_field: String,
}

impl Timestamps {
    /// Uses the `created_at` and `updated_at` field names.
    pub fn new() -> Self {
        Self::with_fields("created_at", "updated_at")
    }

    /// Uses custom field names.
    pub fn with_fields(created: impl Into<String>, updated: impl Into<String>) -> Self {
        Self {
            created_field: created.into(),
            updated_field: updated.into(),
        }
    }

    /// Field stamped once when a record is inserted.
    pub fn created_field(&self) -> &str {
        &self.created_field
    }

    /// Field stamped on every update.
    pub fn updated_field(&self) -> &str {
        &self.updated_field
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Timestamps {
    fn name(&self) -> &str {
        "timestamps"
    }

    fn before_insert(&self, fields: &mut Document) -> DocumentResult<()> {
        if !fields.contains_key(&self.created_field) {
            fields.insert(self.created_field.clone(), DateTime::now());
        }
        Ok(())
    }

    fn before_update(&self, changes: &mut Document) -> DocumentResult<()> {
        changes.insert(self.updated_field.clone(), DateTime::now());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
