//! In-memory storage implementation.
//!
//! Documents live in per-collection vectors in insertion order. Everything sits
//! behind one async-aware read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{
    collections::BTreeMap,
    sync::Arc,
};
use tracing::debug;

use docmodel_core::{
    backend::{ID_KEY, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
};

use crate::evaluator::{DocumentEvaluator, compare_documents};

#[derive(Debug, Default)]
struct CollectionData {
    documents: Vec<Document>,
}

impl CollectionData {
    /// Ids compare as BSON values, so `"1"` and `1` are different documents.
    fn contains_id(&self, id: &Bson) -> bool {
        self.documents
            .iter()
            .any(|document| document.get(ID_KEY) == Some(id))
    }

    fn matching<'a>(&'a self, filter: Option<&'a Expr>) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |document| match filter {
            Some(expr) => DocumentEvaluator::matches(document, expr),
            None => true,
        })
    }
}

type StoreMap = BTreeMap<String, CollectionData>;

fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cheaply cloneable; clones share the same data. Queries scan
/// the whole collection.
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_one(doc! { "_id": "a1", "name": "Alice" }, "people").await?;
/// assert_eq!(store.count(None, "people").await?, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(data) = store.get(collection) else {
            return Ok(Vec::new());
        };

        let mut documents = data
            .matching(query.filter.as_ref())
            .collect::<Vec<_>>();

        if !query.sort.is_empty() {
            documents.sort_by(|a, b| compare_documents(a, b, &query.sort));
        }

        let documents = documents
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(match query.limit {
                Some(0) | None => usize::MAX,
                Some(limit) => limit,
            })
            .cloned()
            .collect::<Vec<_>>();

        debug!(collection, documents = documents.len(), "find");
        Ok(documents)
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .get(collection)
            .map(|data| data.matching(filter.as_ref()).count() as u64)
            .unwrap_or(0))
    }

    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(document) = store
            .get(collection)
            .and_then(|data| data.matching(Some(&filter)).next())
        else {
            return Ok(None);
        };

        let document = match projection {
            None => document.clone(),
            Some(keys) => document
                .iter()
                .filter(|(key, _)| key.as_str() == ID_KEY || keys.iter().any(|k| k == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };

        Ok(Some(document))
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

        let mut store = self.store.write().await;
        let data = store.entry(collection.to_string()).or_default();

        if data.contains_id(&id) {
            return Err(DocumentStoreError::DocumentAlreadyExists(
                display_id(&id),
                collection.to_string(),
            ));
        }

        data.documents.push(document);

        debug!(collection, %id, "insert_one");
        Ok(Some(id))
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

        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(collection) else {
            return Ok(0);
        };

        let Some(document) = data
            .documents
            .iter_mut()
            .find(|document| DocumentEvaluator::matches(document, &filter))
        else {
            return Ok(0);
        };

        for (key, value) in set {
            document.insert(key, value);
        }

        debug!(collection, "update_one");
        Ok(1)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect())
    }
}

/// Builder for [`InMemoryStore`]. Takes no options.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
