use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOneOptions, FindOptions},
};
use tracing::debug;

use docmodel_core::{
    backend::{ID_KEY, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
};

use crate::query::MongoQueryTranslator;

const DUPLICATE_KEY_CODE: i32 = 11000;

fn backend_error(error: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

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
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        options.limit = MongoQueryTranslator::limit(query.limit);
        options.skip = query.offset.and_then(|skip| u64::try_from(skip).ok());
        options.sort = MongoQueryTranslator::sort(&query.sort);

        let documents = self
            .get_collection(collection)
            .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?;

        debug!(collection, documents = documents.len(), "find");
        Ok(documents)
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        let mut options = FindOneOptions::default();

        if let Some(keys) = projection {
            let mut fields = doc! { ID_KEY: 1 };
            for key in keys {
                fields.insert(key, 1);
            }
            options.projection = Some(fields);
        }

        self.get_collection(collection)
            .find_one(MongoQueryTranslator::filter(Some(&filter))?)
            .with_options(options)
            .await
            .map_err(backend_error)
    }

    async fn insert_one(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        let Some(id) = document.get(ID_KEY).cloned() else {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "document inserted into {collection} has no `{ID_KEY}`"
            )));
        };

        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(
                        id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()),
                        collection.to_string(),
                    )
                } else {
                    backend_error(e)
                }
            })?;

        debug!(collection, id = %result.inserted_id, "insert_one");
        Ok(Some(result.inserted_id))
    }

    async fn update_one(
        &self,
        filter: Expr,
        set: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        if set.contains_key(ID_KEY) {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "`{ID_KEY}` cannot be updated"
            )));
        }

        let result = self
            .get_collection(collection)
            .update_one(
                MongoQueryTranslator::filter(Some(&filter))?,
                doc! { "$set": set },
            )
            .await
            .map_err(backend_error)?;

        debug!(collection, matched = result.matched_count, "update_one");
        Ok(result.matched_count)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if !self.list_collections().await?.iter().any(|existing| existing == name) {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;

        names.sort();
        Ok(names)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[derive(Debug)]
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

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        if self.database.trim().is_empty() {
            return Err(DocumentStoreError::Initialization(
                "database name must not be empty".to_string(),
            ));
        }

        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        debug!(database = %self.database, "connected to mongodb");
        Ok(MongoDbStore::new(client, self.database))
    }
}
