//! In-memory storage implementation.
//!
//! Records are kept per collection in insertion order behind an async-aware read-write
//! lock, so unsorted finds return them in the order they were written.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, doc, oid::ObjectId};
use tracing::trace;

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder, Update, UpdateOutcome},
    error::{DocumentError, DocumentResult},
    id::ID_FIELD,
    query::{Expr, FindOptions, Sort, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type StoreMap = HashMap<String, Vec<Document>>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// Queries scan every record in a collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel_core::{backend::StoreBackend, query::FindOptions};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
///
/// let found = store.find("users", doc! { "age": { "$gt": 20 } }, FindOptions::default()).await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> records in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn position(records: &[Document], expr: &Expr) -> DocumentResult<Option<usize>> {
        for (index, record) in records.iter().enumerate() {
            if DocumentEvaluator::matches(record, expr)? {
                return Ok(Some(index));
            }
        }

        Ok(None)
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentResult<Vec<Document>> {
        let expr = Expr::from_filter(&filter)?;

        let mut matched = {
            let store = self.store.read().await;
            match store.get(collection) {
                Some(records) => DocumentEvaluator::filter_documents(records, &expr)?,
                None => return Ok(vec![]),
            }
        };

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_records(&options.sort, a, b));
        }

        let projection = Projection::from_options(&options)?;

        Ok(
            matched
                .into_iter()
                .skip(options.skip.unwrap_or(0))
                .take(options.effective_limit().unwrap_or(usize::MAX))
                .map(|record| projection.apply(record))
                .collect()
        )
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<Bson> {
        let (id, record) = match document.get(ID_FIELD).cloned() {
            Some(id) => (id, document),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut record = doc! { ID_FIELD: id.clone() };
                for (key, value) in document {
                    record.insert(key, value);
                }
                (id, record)
            }
        };

        let mut store = self.store.write().await;
        let records = store
            .entry(collection.to_string())
            .or_default();

        if records.iter().any(|record| record.get(ID_FIELD) == Some(&id)) {
            return Err(DocumentError::DocumentAlreadyExists {
                id: id_text(&id),
                collection: collection.to_string(),
            });
        }

        trace!(collection, id = %id_text(&id), "inserting record");
        records.push(record);

        Ok(id)
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Update) -> DocumentResult<UpdateOutcome> {
        let expr = Expr::from_filter(&filter)?;

        let mut store = self.store.write().await;
        let Some(records) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(index) = Self::position(records, &expr)? else {
            return Ok(UpdateOutcome::default());
        };

        let record = &mut records[index];
        let before = record.clone();

        match update {
            Update::Set(fields) => {
                if fields
                    .get(ID_FIELD)
                    .is_some_and(|id| record.get(ID_FIELD) != Some(id))
                {
                    return Err(DocumentError::Backend(format!(
                        "cannot modify immutable field {ID_FIELD} in collection {collection}"
                    )));
                }
                for (key, value) in fields {
                    record.insert(key, value);
                }
            }
            Update::Unset(fields) => {
                for key in fields.iter().filter(|key| key.as_str() != ID_FIELD) {
                    record.remove(key);
                }
            }
        }

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(*record != before),
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        let expr = Expr::from_filter(&filter)?;

        let mut store = self.store.write().await;
        let Some(records) = store.get_mut(collection) else {
            return Ok(0);
        };

        match Self::position(records, &expr)? {
            Some(index) => {
                records.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        let expr = Expr::from_filter(&filter)?;

        let mut store = self.store.write().await;
        let Some(records) = store.get_mut(collection) else {
            return Ok(0);
        };

        let doomed = records
            .iter()
            .map(|record| DocumentEvaluator::matches(record, &expr))
            .collect::<DocumentResult<Vec<_>>>()?;

        let before = records.len();
        let mut doomed = doomed.into_iter();
        records.retain(|_| !doomed.next().unwrap_or(false));

        Ok((before - records.len()) as u64)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        let expr = Expr::from_filter(&filter)?;

        let store = self.store.read().await;
        let Some(records) = store.get(collection) else {
            return Ok(0);
        };

        let mut count = 0;
        for record in records {
            if DocumentEvaluator::matches(record, &expr)? {
                count += 1;
            }
        }

        Ok(count)
    }
}

fn id_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(id) => id.to_hex(),
        other => other.to_string(),
    }
}

fn compare_records(sort: &[Sort], a: &Document, b: &Document) -> Ordering {
    for key in sort {
        let left = lookup(a, &key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = lookup(b, &key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Field selection applied to each returned record.
enum Projection {
    All,
    KeyOnly,
    Include { fields: Vec<String>, with_id: bool },
    Exclude { fields: Vec<String> },
}

impl Projection {
    fn from_options(options: &FindOptions) -> DocumentResult<Self> {
        if options.return_key {
            return Ok(Projection::KeyOnly);
        }

        let Some(projection) = &options.projection else {
            return Ok(Projection::All);
        };

        let mut with_id = true;
        let mut included = Vec::new();
        let mut excluded = Vec::new();

        for (field, flag) in projection {
            let keep = is_included(flag)?;
            if field == ID_FIELD {
                with_id = keep;
            } else if keep {
                included.push(field.clone());
            } else {
                excluded.push(field.clone());
            }
        }

        match (included.is_empty(), excluded.is_empty()) {
            (false, false) => Err(DocumentError::InvalidFilter(format!(
                "projection cannot mix inclusion and exclusion: {projection}"
            ))),
            (false, true) => Ok(Projection::Include { fields: included, with_id }),
            (true, _) => {
                if !with_id {
                    excluded.push(ID_FIELD.to_string());
                }
                Ok(Projection::Exclude { fields: excluded })
            }
        }
    }

    fn apply(&self, mut record: Document) -> Document {
        match self {
            Projection::All => record,
            Projection::KeyOnly => record
                .remove(ID_FIELD)
                .map(|id| doc! { ID_FIELD: id })
                .unwrap_or_default(),
            Projection::Include { fields, with_id } => record
                .into_iter()
                .filter(|(key, _)| {
                    if key == ID_FIELD {
                        *with_id
                    } else {
                        fields.contains(key)
                    }
                })
                .collect(),
            Projection::Exclude { fields } => {
                for field in fields {
                    record.remove(field);
                }
                record
            }
        }
    }
}

fn is_included(flag: &Bson) -> DocumentResult<bool> {
    match flag {
        Bson::Boolean(keep) => Ok(*keep),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        Bson::Double(n) => Ok(*n != 0.0),
        other => Err(DocumentError::InvalidFilter(format!("unsupported projection value {other}"))),
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`]. Always succeeds.
    async fn build(self) -> DocumentResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
