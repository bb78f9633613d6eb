//! Document instances and their lifecycle.
//!
//! A [`Document`] is an open, ordered field mapping plus an optional identifier, tied to
//! the [`DocumentClass`] that created it. The identifier is absent until the first
//! successful save.
//!
//! Change detection always compares against the persisted record (see
//! [`change`](crate::change)), so `has_changed`, `is_saved` and `save` on a persisted
//! document each read from storage before deciding anything.
//!
//! `save` is a read followed by a write and is not transactional. A concurrent writer
//! touching the same record between the two calls can be overwritten.

use bson::{Bson, Document as Fields, doc, oid::ObjectId};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::{
    backend::Update,
    change::ChangeSet,
    class::DocumentClass,
    collection::CollectionHandle,
    error::{DocumentError, DocumentResult},
    id::{ID_FIELD, parse_object_id},
};

/// Rendering used for dates in [`Document::to_dict`].
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A schemaless document belonging to a [`DocumentClass`].
#[derive(Clone)]
pub struct Document {
    class: DocumentClass,
    id: Option<ObjectId>,
    fields: Fields,
}

/// Outcome of [`Document::delete_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDeletion {
    /// The field was removed from the stored record.
    Removed,
    /// The document has never been saved; only the in-memory field was dropped.
    NotPersisted,
    /// The stored record could not be updated. The failure has already been logged.
    Failed(String),
}

impl Document {
    pub(crate) fn from_parts(class: DocumentClass, id: Option<ObjectId>, fields: Fields) -> Self {
        Self { class, id, fields }
    }

    /// Returns the identifier, or `None` before the first save.
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    /// Returns the class this document belongs to.
    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    /// Returns the in-memory fields. Never contains `_id`.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns the in-memory value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.fields.get(key)
    }

    /// Returns the in-memory value of `key` when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get_str(key).ok()
    }

    /// Sets a field in memory.
    ///
    /// Setting `_id` replaces the identifier; `null` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::FieldValidation`] if an `_id` value does not parse.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bson>) -> DocumentResult<()> {
        let key = key.into();
        let value = value.into();

        if key == ID_FIELD {
            self.id = match value {
                Bson::Null => None,
                other => Some(parse_object_id(&other)?),
            };
        } else {
            self.fields.insert(key, value);
        }

        Ok(())
    }

    /// Removes a field in memory only. See [`Document::delete_field`] for the stored copy.
    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        self.fields.remove(key)
    }

    /// Compares the in-memory fields with the stored record.
    pub async fn changes(&self) -> ChangeSet {
        let Some(id) = self.id else {
            return ChangeSet::New(self.fields.clone());
        };

        let collection = match self.class.collection() {
            Ok(collection) => collection,
            Err(err) => return ChangeSet::Unverified(err),
        };

        match self
            .class
            .tracker()
            .diff(collection, &id, &self.fields)
            .await
        {
            Ok(changed) if changed.is_empty() => ChangeSet::Unchanged,
            Ok(changed) => ChangeSet::Modified(changed),
            Err(err) => ChangeSet::Unverified(err),
        }
    }

    /// Returns the fields whose in-memory value differs from the stored record.
    ///
    /// Best effort: when the stored record cannot be read the failure is logged and an
    /// empty mapping is returned, so an empty result does not prove the document is
    /// persisted. Use [`Document::changes`] to tell the two apart.
    pub async fn has_changed(&self) -> Fields {
        match self.changes().await {
            ChangeSet::Unverified(err) => {
                warn!(
                    class = %self.class.name(),
                    id = ?self.id,
                    %err,
                    "could not verify changes against stored record"
                );
                Fields::new()
            }
            changes => changes.into_fields(),
        }
    }

    /// Returns true if the document has an identifier and [`Document::has_changed`]
    /// reports nothing.
    ///
    /// A document that was never saved is never reported as saved, even with no fields.
    pub async fn is_saved(&self) -> bool {
        self.id.is_some() && self.has_changed().await.is_empty()
    }

    /// Persists the document.
    ///
    /// Inserts when there is no identifier yet and takes the identifier assigned by the
    /// store. Otherwise sends only the changed fields, or nothing at all when nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::CollectionUnavailable`] before any I/O if the class is unbound.
    /// - [`DocumentError::DocumentNotFound`] if the stored record has disappeared.
    /// - The underlying error if the change check itself fails.
    pub async fn save(&mut self) -> DocumentResult<&mut Self> {
        let class = self.class.clone();
        let collection = class.collection()?;

        let Some(id) = self.id else {
            self.insert_into(collection).await?;
            return Ok(self);
        };

        let mut changed = match self.changes().await {
            ChangeSet::Unchanged => {
                debug!(class = %class.name(), %id, "nothing to save");
                return Ok(self);
            }
            ChangeSet::New(changed) | ChangeSet::Modified(changed) => changed,
            ChangeSet::Unverified(err) => return Err(err),
        };

        for capability in class.capabilities() {
            capability.before_update(&mut changed)?;
        }

        let outcome = collection
            .update_one(doc! { ID_FIELD: id }, Update::Set(changed.clone()))
            .await?;

        if outcome.matched == 0 {
            return Err(not_found(id, collection));
        }

        debug!(
            class = %class.name(),
            %id,
            fields = ?changed.keys().collect::<Vec<_>>(),
            "updated document"
        );

        for (key, value) in changed {
            self.fields.insert(key, value);
        }

        Ok(self)
    }

    /// Inserts the document as a new record, keeping an identifier it already has.
    pub(crate) async fn insert(&mut self) -> DocumentResult<ObjectId> {
        let class = self.class.clone();
        self.insert_into(class.collection()?).await
    }

    async fn insert_into(&mut self, collection: &CollectionHandle) -> DocumentResult<ObjectId> {
        let mut fields = self.fields.clone();
        for capability in self.class.capabilities() {
            capability.before_insert(&mut fields)?;
        }

        let mut payload = Fields::new();
        if let Some(id) = self.id {
            payload.insert(ID_FIELD, id);
        }
        for (key, value) in &fields {
            payload.insert(key.clone(), value.clone());
        }

        let id = parse_object_id(&collection.insert_one(payload).await?)?;
        debug!(class = %self.class.name(), %id, "inserted document");

        self.id = Some(id);
        self.fields = fields;

        Ok(id)
    }

    /// Overwrites in-memory fields with the stored values.
    ///
    /// Fields the stored record lacks are left as they are.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::UnsavedDocument`] if the document has no identifier.
    /// - [`DocumentError::DocumentNotFound`] if the stored record has disappeared.
    pub async fn reload(&mut self) -> DocumentResult<&mut Self> {
        let class = self.class.clone();
        let Some(id) = self.id else {
            return Err(unsaved("reload", &class));
        };

        let collection = class.collection()?;
        let record = collection
            .find_one(doc! { ID_FIELD: id })
            .await?
            .ok_or_else(|| not_found(id, collection))?;

        for (key, value) in record {
            if key != ID_FIELD {
                self.fields.insert(key, value);
            }
        }

        Ok(self)
    }

    /// Removes one field from the stored record and from memory.
    ///
    /// Never fails. A storage failure is logged and reported as
    /// [`FieldDeletion::Failed`]; the in-memory field is then kept so it still mirrors
    /// the stored record.
    pub async fn delete_field(&mut self, name: &str) -> FieldDeletion {
        let Some(id) = self.id else {
            self.fields.remove(name);
            return FieldDeletion::NotPersisted;
        };

        let class = self.class.clone();
        let result = match class.collection() {
            Ok(collection) => collection
                .update_one(doc! { ID_FIELD: id }, Update::Unset(vec![name.to_string()]))
                .await
                .and_then(|outcome| match outcome.matched {
                    0 => Err(not_found(id, collection)),
                    _ => Ok(()),
                }),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.fields.remove(name);
                info!(class = %class.name(), %id, field = name, "deleted field");
                FieldDeletion::Removed
            }
            Err(err) => {
                error!(class = %class.name(), %id, field = name, %err, "failed to delete field");
                FieldDeletion::Failed(err.to_string())
            }
        }
    }

    /// Deletes the stored record.
    ///
    /// The identifier stays on the instance, which is stale afterwards: saving or
    /// reloading it again is not supported.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::CollectionUnavailable`] if the class is unbound.
    /// - [`DocumentError::UnsavedDocument`] if the document has no identifier.
    pub async fn delete_document(&self) -> DocumentResult<()> {
        let collection = self.class.collection()?;
        let id = self
            .id
            .ok_or_else(|| unsaved("delete", &self.class))?;

        let deleted = collection
            .delete_one(doc! { ID_FIELD: id })
            .await?;
        debug!(class = %self.class.name(), %id, deleted, "deleted document");

        Ok(())
    }

    /// Renders the document as a plain mapping.
    ///
    /// `_id` comes first, as its hex string or `null`. Top-level identifiers become hex
    /// strings and dates become [`DATETIME_FORMAT`] strings. Nested values are untouched.
    pub fn to_dict(&self) -> Fields {
        let mut dict = Fields::new();
        dict.insert(
            ID_FIELD,
            self.id
                .map_or(Bson::Null, |id| Bson::String(id.to_hex())),
        );

        for (key, value) in &self.fields {
            dict.insert(key.clone(), canonicalize(value));
        }

        dict
    }

    /// Renders [`Document::to_dict`] as a JSON string.
    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string(&self.to_dict())?)
    }
}

fn canonicalize(value: &Bson) -> Bson {
    match value {
        Bson::ObjectId(id) => Bson::String(id.to_hex()),
        Bson::DateTime(at) => Bson::String(
            at.to_chrono()
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        other => other.clone(),
    }
}

fn not_found(id: ObjectId, collection: &CollectionHandle) -> DocumentError {
    DocumentError::DocumentNotFound {
        id: id.to_hex(),
        collection: collection.name().to_string(),
    }
}

fn unsaved(operation: &'static str, class: &DocumentClass) -> DocumentError {
    DocumentError::UnsavedDocument {
        operation,
        collection: class.collection_name().to_string(),
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.id == other.id && self.fields == other.fields
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.to_dict().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.class.name())?;
        for (i, (key, value)) in self.to_dict().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;

    fn user(fields: Fields) -> Document {
        DocumentClass::new("User")
            .from_fields(fields)
            .unwrap()
    }

    #[test]
    fn set_validates_identifier() {
        let mut document = user(doc! { "name": "Alice" });
        let id = ObjectId::new();

        document.set("_id", id.to_hex()).unwrap();
        assert_eq!(document.id(), Some(id));

        assert!(document.set("_id", "bogus").is_err());
        assert_eq!(document.id(), Some(id));

        document.set("_id", Bson::Null).unwrap();
        assert_eq!(document.id(), None);

        document.set("age", 19).unwrap();
        assert_eq!(document.get("age"), Some(&Bson::Int32(19)));
        assert_eq!(document.remove("age"), Some(Bson::Int32(19)));
    }

    #[test]
    fn to_dict_canonicalizes_ids_and_dates() {
        let id = ObjectId::parse_str("642409e87f768856f3b50841").unwrap();
        let friend = ObjectId::parse_str("642409e87f768856f3b50842").unwrap();
        let joined = DateTime::from_millis(1_680_000_000_123);

        let document = user(doc! {
            "_id": id,
            "friend": friend,
            "joined": joined,
            "tags": ["a", "b"],
            "nested": { "ref": friend },
        });

        let dict = document.to_dict();
        assert_eq!(dict.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(dict.get_str("_id").unwrap(), "642409e87f768856f3b50841");
        assert_eq!(dict.get_str("friend").unwrap(), "642409e87f768856f3b50842");
        assert_eq!(dict.get_str("joined").unwrap(), "2023-03-28T10:40:00.123Z");
        assert_eq!(dict.get_document("nested").unwrap(), &doc! { "ref": friend });
    }

    #[test]
    fn unsaved_document_renders_null_id() {
        let document = user(doc! { "name": "Alice", "age": 18 });
        assert_eq!(
            document.to_json().unwrap(),
            r#"{"_id":null,"name":"Alice","age":18}"#
        );
        assert_eq!(document.to_string(), "_id = null\nname = \"Alice\"\nage = 18");
        assert_eq!(format!("{document:?}"), "User(_id=null, name=\"Alice\", age=18)");
    }

    #[tokio::test]
    async fn new_documents_report_all_fields_changed() {
        let document = user(doc! { "name": "Alice" });
        assert!(matches!(document.changes().await, ChangeSet::New(_)));
        assert_eq!(document.has_changed().await, doc! { "name": "Alice" });
        assert!(!document.is_saved().await);
    }

    #[tokio::test]
    async fn empty_unsaved_documents_are_not_saved() {
        let document = DocumentClass::new("User")
            .construct(crate::class::DocumentArgs::new())
            .unwrap();

        assert!(document.fields().is_empty());
        assert!(document.has_changed().await.is_empty());
        assert!(!document.is_saved().await);
    }

    #[tokio::test]
    async fn unbound_operations_fail() {
        let mut document = user(doc! { "name": "Alice" });

        assert!(matches!(
            document.save().await.unwrap_err(),
            DocumentError::CollectionUnavailable(ref name) if name == "users"
        ));
        assert!(matches!(
            document.reload().await.unwrap_err(),
            DocumentError::UnsavedDocument { operation: "reload", .. }
        ));
        assert_eq!(document.delete_field("name").await, FieldDeletion::NotPersisted);
        assert!(document.fields().is_empty());
    }
}
