//! Storage gateway abstraction.
//!
//! The model layer talks to a document store through the [`StoreBackend`] trait: a
//! small set of async operations over named collections of BSON documents. Every
//! document is identified by its [`ID_KEY`] entry.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe mirror for backends chosen at runtime
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docmodel_core::backend::StoreBackend;
//! use docmodel_core::query::{Filter, Query};
//! use bson::doc;
//!
//! backend.insert_one(doc! { "_id": "a1", "name": "Alice" }, "people").await?;
//! let matched = backend
//!     .update_one(Filter::eq("_id", "a1"), doc! { "name": "Alicia" }, "people")
//!     .await?;
//! assert_eq!(matched, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{any::Any, fmt::Debug};

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// Document key every backend uses for document identity.
pub const ID_KEY: &str = "_id";

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Single-document writes are expected to be atomic; nothing else is
/// serialized across calls.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// A missing collection is not an error for reads: it simply holds no documents.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Runs a query: filter, then sort, then offset, then limit.
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>>;

    /// Counts the documents matching `filter` (all documents when `None`).
    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;

    /// Returns the first document matching `filter`.
    ///
    /// With a projection, the returned document only carries the listed keys plus
    /// [`ID_KEY`].
    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Inserts one document and returns its id as acknowledged by the store.
    ///
    /// Inserting a document whose id already exists fails with
    /// [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists).
    /// The collection is created if needed.
    async fn insert_one(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;

    /// Sets the keys of `set` on the first document matching `filter`, leaving its
    /// other keys untouched. Returns the number of matched documents (0 or 1).
    async fn update_one(
        &self,
        filter: Expr,
        set: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>>;
    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;
    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;
    async fn insert_one(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;
    async fn update_one(
        &self,
        filter: Expr,
        set: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find(self, query, collection).await
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::count(self, filter, collection).await
    }

    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        StoreBackend::find_one(self, filter, projection, collection).await
    }

    async fn insert_one(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::insert_one(self, document, collection).await
    }

    async fn update_one(
        &self,
        filter: Expr,
        set: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::update_one(self, filter, set, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A boxed runtime-selected backend is itself a backend.
#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        DynStoreBackend::find(&**self, query, collection).await
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        DynStoreBackend::count(&**self, filter, collection).await
    }

    async fn find_one(
        &self,
        filter: Expr,
        projection: Option<Vec<String>>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        DynStoreBackend::find_one(&**self, filter, projection, collection).await
    }

    async fn insert_one(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        DynStoreBackend::insert_one(&**self, document, collection).await
    }

    async fn update_one(
        &self,
        filter: Expr,
        set: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        DynStoreBackend::update_one(&**self, filter, set, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::create_collection(&**self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(&**self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        DynStoreBackend::list_collections(&**self).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        <dyn DynStoreBackend as DynStoreBackend>::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
