//! Main entry point binding model types to a storage backend.
//!
//! - [`DocumentStore`] - store over a backend type known at compile time
//! - [`DynDocumentStore`] - store over a backend selected at runtime
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{DocumentStore, memory::InMemoryStore};
//!
//! Person::register()?;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let people = store.models::<Person>()?;
//! let mary = people.create(doc! { "name": "Mary" }).await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::ModelCollection,
    error::{DocumentStoreResult, ModelResult},
    model::Model,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

/// A document store whose backend was chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Store-backed operations for the model type `M`.
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::Unregistered`](crate::error::ModelError::Unregistered)
    /// if `M` has not been registered.
    pub fn models<M: Model>(&self) -> ModelResult<ModelCollection<'_, B, M>> {
        ModelCollection::new(&self.backend)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and every document in it.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl DynDocumentStore {
    pub fn from_boxed(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// The concrete backend, if it is a `T`.
    pub fn backend_as<T: StoreBackend + 'static>(&self) -> Option<&T> {
        DynStoreBackend::as_any(&*self.backend).downcast_ref::<T>()
    }
}

/// Conversion of a store into its runtime-dispatched form.
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DocumentStore::from_boxed(Box::new(self.backend))
    }
}

/// Recovers a statically typed store from a [`DynDocumentStore`].
pub trait IntoStaticDocumentStore {
    /// Returns `None` when the backend is not a `B`.
    fn into_static<B>(self) -> Option<DocumentStore<B>>
    where
        B: StoreBackend + 'static;
}

impl IntoStaticDocumentStore for DynDocumentStore {
    fn into_static<B>(self) -> Option<DocumentStore<B>>
    where
        B: StoreBackend + 'static,
    {
        <dyn DynStoreBackend as DynStoreBackend>::into_any(self.backend)
            .downcast::<B>()
            .ok()
            .map(|backend| DocumentStore::new(*backend))
    }
}
