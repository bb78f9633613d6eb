//! Document classes: the runtime document type.
//!
//! A [`DocumentClass`] names a kind of document, owns the collection binding shared by all
//! of its instances, and carries the class-level query surface. Classes are cheap to clone;
//! clones share the binding.
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
//!
//! let adults = users.find(Filter::gte("age", 18), FindOptions::default()).await?;
//! ```

use bson::{Bson, Document as Fields, doc, oid::ObjectId};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

use crate::{
    capability::Capability,
    change::{ChangeTracker, PersistedDiff},
    collection::CollectionHandle,
    connection,
    document::Document,
    error::{DocumentError, DocumentResult},
    id::{ID_FIELD, normalize_id_filter, parse_object_id},
    naming::default_collection_name,
    query::{Filter, FindOptions},
    results::ResultList,
    store::Database,
};

/// A runtime document type bound (eventually) to one collection.
#[derive(Debug, Clone)]
pub struct DocumentClass {
    inner: Arc<ClassInner>,
}

#[derive(Debug)]
struct ClassInner {
    name: String,
    collection_name: String,
    binding: OnceLock<CollectionHandle>,
    capabilities: Vec<Arc<dyn Capability>>,
    tracker: Arc<dyn ChangeTracker>,
}

impl DocumentClass {
    /// Creates a class with the default collection name and no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Starts building a class named `name`.
    pub fn builder(name: impl Into<String>) -> DocumentClassBuilder {
        DocumentClassBuilder::new(name)
    }

    /// Returns the class name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the name of the backing collection.
    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    /// Binds the class to its collection in `database`.
    ///
    /// A class binds at most once. Returns false if it was already bound, in which case
    /// the existing binding is kept.
    pub fn bind(&self, database: &Database) -> bool {
        let bound = self
            .inner
            .binding
            .set(database.collection(&self.inner.collection_name))
            .is_ok();

        if bound {
            debug!(
                class = %self.inner.name,
                collection = %self.inner.collection_name,
                database = %database.name(),
                "bound document class"
            );
        }

        bound
    }

    /// Returns true if a collection handle has been resolved.
    pub fn is_bound(&self) -> bool {
        self.inner.binding.get().is_some()
    }

    /// Returns the bound collection, resolving it from the process-wide connection on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::CollectionUnavailable`] when the class is unbound and no
    /// process-wide connection has been established.
    pub fn collection(&self) -> DocumentResult<&CollectionHandle> {
        if let Some(handle) = self.inner.binding.get() {
            return Ok(handle);
        }

        let database = connection::get_connection()
            .ok_or_else(|| DocumentError::CollectionUnavailable(self.inner.collection_name.clone()))?;
        self.bind(&database);

        self.inner
            .binding
            .get()
            .ok_or_else(|| DocumentError::CollectionUnavailable(self.inner.collection_name.clone()))
    }

    /// Returns the extra capabilities of this class, in registration order.
    pub fn capabilities(&self) -> &[Arc<dyn Capability>] {
        &self.inner.capabilities
    }

    /// Returns the capability of type `T`, if the class has one.
    pub fn capability<T: Capability + 'static>(&self) -> Option<&T> {
        self.inner
            .capabilities
            .iter()
            .find_map(|capability| capability.as_any().downcast_ref::<T>())
    }

    pub(crate) fn tracker(&self) -> &dyn ChangeTracker {
        self.inner.tracker.as_ref()
    }

    /// Builds an instance from construction arguments.
    ///
    /// Accepts exactly one of: a single field mapping, a single instance of this class, or
    /// named values. A copied instance keeps its identifier.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::Construction`] for more than one positional source, a positional
    ///   source mixed with named values, or an instance of another class.
    /// - [`DocumentError::FieldValidation`] for an `_id` that is not a valid identifier.
    pub fn construct(&self, args: DocumentArgs) -> DocumentResult<Document> {
        let DocumentArgs { mut positional, named } = args;

        let fields = match (positional.pop(), positional.is_empty(), named.is_empty()) {
            (None, _, _) => named,
            (Some(Source::Fields(fields)), true, true) => fields,
            (Some(Source::Instance(other)), true, true) => return self.copy_of(other),
            (Some(_), _, _) => {
                return Err(DocumentError::Construction(format!(
                    "{} takes one field mapping, one instance or named values; got {} positional source(s) and {} named value(s)",
                    self.name(),
                    positional.len() + 1,
                    named.len()
                )));
            }
        };

        self.from_source(fields)
    }

    /// Builds an instance from a field mapping.
    pub fn from_fields(&self, fields: Fields) -> DocumentResult<Document> {
        self.construct(DocumentArgs::fields(fields))
    }

    /// Builds a shallow copy of another instance of this class.
    pub fn from_instance(&self, other: &Document) -> DocumentResult<Document> {
        self.construct(DocumentArgs::instance(other.clone()))
    }

    fn copy_of(&self, other: Document) -> DocumentResult<Document> {
        if other.class() != self {
            return Err(DocumentError::Construction(format!(
                "cannot build {} from an instance of {}",
                self.name(),
                other.class().name()
            )));
        }

        self.resolve_binding();
        Ok(other)
    }

    fn from_source(&self, mut fields: Fields) -> DocumentResult<Document> {
        let id = match fields.remove(ID_FIELD) {
            None | Some(Bson::Null) => None,
            Some(value) => Some(parse_object_id(&value)?),
        };

        self.resolve_binding();
        Ok(Document::from_parts(self.clone(), id, fields))
    }

    fn resolve_binding(&self) {
        if let Err(err) = self.collection() {
            debug!(class = %self.inner.name, %err, "collection binding deferred");
        }
    }

    /// Runs a raw find and returns the stored records unwrapped.
    pub async fn find_raw(&self, filter: Fields, options: FindOptions) -> DocumentResult<Vec<Fields>> {
        self.collection()?
            .find(filter, options)
            .await
    }

    /// Returns every document matching `filter`.
    ///
    /// A string `_id` in the filter is converted to its `ObjectId` form first.
    pub async fn find(&self, mut filter: Fields, options: FindOptions) -> DocumentResult<ResultList<Document>> {
        normalize_id_filter(&mut filter)?;

        self.find_raw(filter, options)
            .await?
            .into_iter()
            .map(|record| self.from_source(record))
            .collect()
    }

    /// Returns the first document matching `filter`.
    pub async fn find_one(&self, filter: Fields) -> DocumentResult<Option<Document>> {
        Ok(self
            .find(filter, FindOptions::builder().limit(1).build())
            .await?
            .into_first())
    }

    /// Returns the document with the given identifier.
    ///
    /// An identifier that does not parse yields `None` instead of an error.
    pub async fn find_by_id(&self, id: impl Into<Bson>) -> DocumentResult<Option<Document>> {
        let Ok(id) = parse_object_id(&id.into()) else {
            return Ok(None);
        };

        self.find_one(doc! { ID_FIELD: id }).await
    }

    /// Returns the documents whose `field` holds one of `values`.
    pub async fn find_in<V: Into<Bson>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentResult<ResultList<Document>> {
        self.find(Filter::is_in(field, values), FindOptions::default())
            .await
    }

    /// Returns every document in the collection.
    pub async fn all(&self, options: FindOptions) -> DocumentResult<ResultList<Document>> {
        self.find(Fields::new(), options).await
    }

    /// Deletes every document matching `filter`.
    pub async fn delete(&self, mut filter: Fields) -> DocumentResult<()> {
        normalize_id_filter(&mut filter)?;

        let deleted = self
            .collection()?
            .delete_many(filter)
            .await?;
        debug!(class = %self.inner.name, deleted, "deleted documents");

        Ok(())
    }

    /// Constructs and inserts each record independently.
    ///
    /// A record whose write fails is logged and skipped; the rest of the batch continues.
    /// Records carrying an `_id` are inserted under that identifier.
    ///
    /// # Errors
    ///
    /// Stops at the first record that cannot be constructed, or whose failure is not a
    /// storage write failure (for example an unbound class). Records stored before that
    /// point stay stored: the error is then [`DocumentError::BatchAborted`] carrying
    /// their identifiers, otherwise the cause itself.
    pub async fn insert_many(&self, records: impl IntoIterator<Item = Fields>) -> DocumentResult<InsertManyReport> {
        let mut report = InsertManyReport::default();

        for record in records {
            let mut document = match self.from_fields(record) {
                Ok(document) => document,
                Err(err) => return Err(report.abort(err)),
            };

            match document.insert().await {
                Ok(id) => report.inserted.push(id),
                Err(err) if err.is_write_failure() => {
                    error!(
                        class = %self.inner.name,
                        %err,
                        record = ?document,
                        "skipping record that failed to insert"
                    );
                    report.skipped += 1;
                }
                Err(err) => return Err(report.abort(err)),
            }
        }

        Ok(report)
    }

    /// Counts the documents matching `filter`, or all documents when `None`.
    pub async fn document_count(&self, filter: Option<Fields>) -> DocumentResult<u64> {
        let mut filter = filter.unwrap_or_default();
        normalize_id_filter(&mut filter)?;

        self.collection()?
            .count_documents(filter)
            .await
    }
}

impl PartialEq for DocumentClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DocumentClass {}

/// Builder for [`DocumentClass`].
#[derive(Debug)]
pub struct DocumentClassBuilder {
    name: String,
    collection_name: Option<String>,
    capabilities: Vec<Arc<dyn Capability>>,
    tracker: Option<Arc<dyn ChangeTracker>>,
    database: Option<Database>,
}

impl DocumentClassBuilder {
    /// Starts a class named `name` with no capabilities and the default tracker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_name: None,
            capabilities: Vec::new(),
            tracker: None,
            database: None,
        }
    }

    /// Uses an explicit collection name instead of the one derived from the class name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Adds a capability. Hooks run in the order capabilities are added.
    pub fn capability(self, capability: impl Capability + 'static) -> Self {
        self.shared_capability(Arc::new(capability))
    }

    /// Adds a capability already shared with other classes.
    pub fn shared_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Replaces the default [`PersistedDiff`] change tracker.
    pub fn change_tracker(mut self, tracker: impl ChangeTracker + 'static) -> Self {
        self.tracker = Some(Arc::new(tracker));
        self
    }

    /// Binds the class to `database` as soon as it is built.
    pub fn bind(mut self, database: &Database) -> Self {
        self.database = Some(database.clone());
        self
    }

    /// Builds the class, deriving the collection name from the class name when none
    /// was given.
    pub fn build(self) -> DocumentClass {
        let collection_name = self
            .collection_name
            .unwrap_or_else(|| default_collection_name(&self.name));

        let class = DocumentClass {
            inner: Arc::new(ClassInner {
                name: self.name,
                collection_name,
                binding: OnceLock::new(),
                capabilities: self.capabilities,
                tracker: self
                    .tracker
                    .unwrap_or_else(|| Arc::new(PersistedDiff)),
            }),
        };

        if let Some(database) = &self.database {
            class.bind(database);
        }

        class
    }
}

/// A positional construction source.
#[derive(Debug, Clone)]
pub enum Source {
    /// A plain field mapping.
    Fields(Fields),
    /// An existing instance to copy.
    Instance(Document),
}

impl From<Fields> for Source {
    fn from(fields: Fields) -> Self {
        Source::Fields(fields)
    }
}

impl From<Document> for Source {
    fn from(document: Document) -> Self {
        Source::Instance(document)
    }
}

/// Construction arguments: positional sources plus named values.
#[derive(Debug, Clone, Default)]
pub struct DocumentArgs {
    positional: Vec<Source>,
    named: Fields,
}

impl DocumentArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// One field mapping.
    pub fn fields(fields: Fields) -> Self {
        Self::new().positional(fields)
    }

    /// One instance to copy.
    pub fn instance(document: Document) -> Self {
        Self::new().positional(document)
    }

    /// Named values only.
    pub fn named(named: Fields) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }

    /// Adds a positional source.
    pub fn positional(mut self, source: impl Into<Source>) -> Self {
        self.positional.push(source.into());
        self
    }

    /// Adds a named value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }
}

/// Outcome of [`DocumentClass::insert_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertManyReport {
    /// Identifiers of the inserted records, in input order.
    pub inserted: Vec<ObjectId>,
    /// Number of records skipped after a write failure.
    pub skipped: usize,
}

impl InsertManyReport {
    fn abort(self, err: DocumentError) -> DocumentError {
        if self.inserted.is_empty() {
            return err;
        }

        DocumentError::BatchAborted {
            inserted: self.inserted,
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Timestamps;

    #[test]
    fn collection_name_defaults_to_snake_plural() {
        let class = DocumentClass::new("BlogPost");
        assert_eq!(class.name(), "BlogPost");
        assert_eq!(class.collection_name(), "blog_posts");

        let class = DocumentClass::builder("Person").collection("people").build();
        assert_eq!(class.collection_name(), "people");
    }

    #[test]
    fn builds_from_each_construction_form() {
        let class = DocumentClass::new("User");

        let from_fields = class.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
        assert_eq!(from_fields.id(), None);
        assert_eq!(from_fields.fields(), &doc! { "name": "Alice", "age": 18 });

        let named = class
            .construct(DocumentArgs::new().with("name", "Alice").with("age", 18))
            .unwrap();
        assert_eq!(named, from_fields);

        let copy = class.from_instance(&from_fields).unwrap();
        assert_eq!(copy, from_fields);
    }

    #[test]
    fn parses_and_normalizes_identifiers() {
        let class = DocumentClass::new("User");
        let id = ObjectId::new();

        let document = class.from_fields(doc! { "_id": id.to_hex(), "name": "Bob" }).unwrap();
        assert_eq!(document.id(), Some(id));
        assert!(!document.fields().contains_key("_id"));

        let document = class.from_fields(doc! { "_id": Bson::Null }).unwrap();
        assert_eq!(document.id(), None);

        let err = class.from_fields(doc! { "_id": "xyz" }).unwrap_err();
        assert!(matches!(err, DocumentError::FieldValidation { ref value, .. } if value.contains("xyz")));
    }

    #[test]
    fn rejects_conflicting_arguments() {
        let class = DocumentClass::new("User");

        let err = class
            .construct(
                DocumentArgs::new()
                    .positional(doc! { "a": 1 })
                    .positional(doc! { "b": 2 }),
            )
            .unwrap_err();
        assert!(matches!(err, DocumentError::Construction(ref msg) if msg.contains("2 positional")));

        let err = class
            .construct(DocumentArgs::fields(doc! { "a": 1 }).with("b", 2))
            .unwrap_err();
        assert!(matches!(err, DocumentError::Construction(_)));
    }

    #[test]
    fn rejects_copy_from_another_class() {
        let users = DocumentClass::new("User");
        let posts = DocumentClass::new("Post");

        let post = posts.from_fields(doc! { "title": "Hello" }).unwrap();
        let err = users.from_instance(&post).unwrap_err();
        assert!(matches!(err, DocumentError::Construction(ref msg) if msg.contains("Post")));
    }

    #[test]
    fn finds_capabilities_by_type() {
        let class = DocumentClass::builder("Event")
            .capability(Timestamps::with_fields("at", "touched"))
            .build();

        let stamps = class.capability::<Timestamps>().unwrap();
        assert_eq!(stamps.created_field(), "at");
        assert_eq!(class.capabilities().len(), 1);
    }

    #[test]
    fn binds_once() {
        let class = DocumentClass::new("User");
        let first = Database::from_shared("first", Arc::new(crate::backend::tests::NullBackend));
        let second = Database::from_shared("second", Arc::new(crate::backend::tests::NullBackend));

        assert!(class.bind(&first));
        assert!(!class.bind(&second));
        assert!(class.is_bound());
        assert_eq!(class.collection().unwrap().name(), "users");
    }

    #[test]
    fn clones_share_identity() {
        let class = DocumentClass::new("User");
        assert_eq!(class, class.clone());
        assert_ne!(class, DocumentClass::new("User"));
    }
}
