use std::sync::Arc;
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions as MongoFindOptions},
};
use tracing::debug;
use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder, Update, UpdateOutcome},
    connection::{ConnectionSettings, Connector},
    error::{DocumentError, DocumentResult},
    id::ID_FIELD,
    query::FindOptions,
};

const DUPLICATE_KEY: i32 = 11000;


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Round-trips a ping to the server.
    pub async fn ping(&self) -> DocumentResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentError::Connection(e.to_string()))?;

        Ok(())
    }
}

fn driver_options(options: &FindOptions) -> MongoFindOptions {
    let mut driver = MongoFindOptions::default();

    driver.sort = options.sort_document();
    driver.projection = options.projection.clone();

    if let Some(limit) = options.effective_limit() {
        driver.limit = Some(limit as i64);
    }
    if let Some(skip) = options.skip {
        driver.skip = Some(skip as u64);
    }
    if options.return_key {
        driver.return_key = Some(true);
    }

    driver
}

fn write_error(err: MongoError, id: Option<&Bson>, collection: &str) -> DocumentError {
    match (err.kind.as_ref(), id) {
        (ErrorKind::Write(WriteFailure::WriteError(failure)), Some(id)) if failure.code == DUPLICATE_KEY => {
            DocumentError::DocumentAlreadyExists {
                id: match id {
                    Bson::ObjectId(id) => id.to_hex(),
                    other => other.to_string(),
                },
                collection: collection.to_string(),
            }
        }
        _ => DocumentError::Backend(err.to_string()),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(driver_options(&options))
            .await
            .map_err(|e| DocumentError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentError::Backend(e.to_string()))
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| DocumentError::Backend(e.to_string()))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<Bson> {
        let id = document.get(ID_FIELD).cloned();

        Ok(
            self.get_collection(collection)
                .insert_one(document)
                .await
                .map_err(|e| write_error(e, id.as_ref(), collection))?
                .inserted_id
        )
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Update) -> DocumentResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update.to_document())
            .await
            .map_err(|e| DocumentError::Backend(e.to_string()))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(filter)
                .await
                .map_err(|e| DocumentError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_many(filter)
                .await
                .map_err(|e| DocumentError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| DocumentError::Backend(e.to_string()))
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentError::Connection(e.to_string()))?,
            )
            .map_err(|e| DocumentError::Connection(e.to_string()))?,
            self.database,
        ))
    }
}

/// Connects `mongodb://` and `mongodb+srv://` connection strings.
///
/// The server is pinged before the connection is accepted, so an unreachable candidate
/// fails here and the next one is tried.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDbConnector;

#[async_trait]
impl Connector for MongoDbConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> DocumentResult<Arc<dyn StoreBackend>> {
        let store = MongoDbStore::builder(&settings.connection_string, &settings.database_name)
            .build()
            .await?;
        store.ping().await?;

        debug!(database = %settings.database_name, "connected to mongodb");
        Ok(Arc::new(store))
    }
}
