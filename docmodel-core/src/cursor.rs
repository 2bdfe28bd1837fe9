//! Lazy, restartable cursors over a backend's `find`.

use bson::Document;
use std::collections::VecDeque;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    query::{Query, Sort},
};

/// A query bound to a collection, executed on first use.
///
/// The first [`next`](Self::next) runs the query and buffers the batch; later calls
/// drain the buffer. Cloning yields an un-iterated cursor over the same query.
#[derive(Debug)]
pub struct Cursor<'a, B: StoreBackend> {
    backend: &'a B,
    collection: String,
    query: Query,
    buffer: Option<VecDeque<Document>>,
}

impl<'a, B: StoreBackend> Clone for Cursor<'a, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            collection: self.collection.clone(),
            query: self.query.clone(),
            buffer: None,
        }
    }
}

impl<'a, B: StoreBackend> Cursor<'a, B> {
    pub fn new(backend: &'a B, collection: impl Into<String>, query: Query) -> Self {
        Self {
            backend,
            collection: collection.into(),
            query,
            buffer: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Replaces the ordering. Restarts iteration.
    pub fn sort(mut self, keys: impl IntoIterator<Item = Sort>) -> Self {
        self.query.sort = keys.into_iter().collect();
        self.buffer = None;
        self
    }

    /// Restarts iteration.
    pub fn skip(mut self, skip: usize) -> Self {
        self.query.offset = Some(skip);
        self.buffer = None;
        self
    }

    /// Restarts iteration. A limit of 0 means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self.buffer = None;
        self
    }

    /// Number of documents matching the filter, ignoring skip and limit.
    pub async fn count(&self) -> DocumentStoreResult<u64> {
        self.backend
            .count(self.query.filter.clone(), &self.collection)
            .await
    }

    pub async fn next(&mut self) -> DocumentStoreResult<Option<Document>> {
        if self.buffer.is_none() {
            let batch = self
                .backend
                .find(self.query.clone(), &self.collection)
                .await?;
            debug!(
                collection = %self.collection,
                documents = batch.len(),
                "cursor fetched batch"
            );
            self.buffer = Some(batch.into());
        }

        Ok(self
            .buffer
            .as_mut()
            .and_then(VecDeque::pop_front))
    }

    /// The `index`-th document of the result window, independent of iteration.
    pub async fn index(&self, index: usize) -> DocumentStoreResult<Option<Document>> {
        if self.query.limit.is_some_and(|limit| limit > 0 && index >= limit) {
            return Ok(None);
        }

        let query = Query {
            filter: self.query.filter.clone(),
            sort: self.query.sort.clone(),
            offset: Some(self.query.offset.unwrap_or(0).saturating_add(index)),
            limit: Some(1),
        };

        Ok(self
            .backend
            .find(query, &self.collection)
            .await?
            .into_iter()
            .next())
    }

    /// Drops buffered results; the next `next` runs the query again.
    pub fn rewind(&mut self) {
        self.buffer = None;
    }
}
