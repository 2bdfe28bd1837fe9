//! In-memory storage backend for docmodel.
//!
//! [`InMemoryStore`] implements the `StoreBackend` trait entirely in memory, behind
//! an async-aware read-write lock. It evaluates the full query AST (filters with
//! dotted paths, multi-key sorts, offset and limit) and is the backend used for
//! development and tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{DocumentStore, memory::InMemoryStore, prelude::*};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Person::register()?;
//!
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let people = store.models::<Person>()?;
//!     let mary = people.create(doc! { "name": "Mary" }).await?;
//!     assert!(!mary.is_new());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
