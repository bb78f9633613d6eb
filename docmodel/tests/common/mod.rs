#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use docmodel::{
    backend::{StoreBackend, Update, UpdateOutcome},
    bson::{Bson, Document},
    error::{DocumentError, DocumentResult},
    memory::InMemoryStore,
    query::FindOptions,
    store::Database,
};

/// In-memory backend that counts writes and can be told to fail.
#[derive(Debug, Default)]
pub struct ProbeBackend {
    pub inner: InMemoryStore,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl ProbeBackend {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> DocumentResult<()> {
        match self.fail_reads.load(Ordering::SeqCst) {
            true => Err(DocumentError::Backend("reads are switched off".into())),
            false => Ok(()),
        }
    }

    fn write(&self) -> DocumentResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DocumentError::Backend("writes are switched off".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for ProbeBackend {
    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentResult<Vec<Document>> {
        self.read()?;
        self.inner.find(collection, filter, options).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<Bson> {
        self.write()?;
        self.inner.insert_one(collection, document).await
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Update) -> DocumentResult<UpdateOutcome> {
        self.write()?;
        self.inner.update_one(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.write()?;
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.write()?;
        self.inner.delete_many(collection, filter).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.read()?;
        self.inner.count_documents(collection, filter).await
    }
}

/// A fresh database over a [`ProbeBackend`].
pub fn probe_database() -> (Arc<ProbeBackend>, Database) {
    let probe = Arc::new(ProbeBackend::default());
    let database = Database::from_shared("test", probe.clone());
    (probe, database)
}

pub const NAMES: [&str; 26] = [
    "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Heidi", "Ivan", "Judy", "Karl",
    "Linda", "Mallory", "Nina", "Oscar", "Peggy", "Quentin", "Rupert", "Sybil", "Trent", "Ursula",
    "Victor", "Walter", "Xavier", "Yvonne", "Zach",
];

/// `{name, age}` records for Alice (18) through Zach (43).
pub fn people() -> Vec<Document> {
    NAMES
        .iter()
        .zip(18..)
        .map(|(name, age)| docmodel::bson::doc! { "name": *name, "age": age })
        .collect()
}
