//! Main docmodel crate: typed models over schemaless document stores.
//!
//! This crate is the primary entry point for users of docmodel. It re-exports the
//! core types from the sub-crates and provides access to the storage backends, plus
//! configuration-driven store construction and a logging bootstrap.
//!
//! # Features
//!
//! - **Declared schemas** - Typed fields with coercion and defaults, validated once at registration
//! - **Two representations** - Storage documents keyed by raw key, and a JSON-safe external form
//! - **Lazy results** - Restartable fetch results with sorting, windows, streams and pages
//! - **Multiple backends** - In-memory and MongoDB storage behind one gateway trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[derive(Debug)]
//! pub struct Person(Record);
//!
//! impl Model for Person {
//!     fn declare() -> SchemaBuilder {
//!         Schema::builder("Person")
//!             .table("people")
//!             .field(Field::identity("person_id"))
//!             .field(Field::string("name"))
//!             .field(Field::int("age"))
//!     }
//!
//!     fn schema_cell() -> &'static SchemaCell {
//!         static SCHEMA: SchemaCell = SchemaCell::new();
//!         &SCHEMA
//!     }
//!
//!     fn from_record(record: Record) -> Self { Person(record) }
//!     fn record(&self) -> &Record { &self.0 }
//!     fn record_mut(&mut self) -> &mut Record { &mut self.0 }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     docmodel::logging::init("docmodel=debug");
//!     Person::register()?;
//!
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let people = store.models::<Person>()?;
//!
//!     let mut mary = people.create(doc! { "name": "Mary", "age": 20 }).await?;
//!     mary.set("age", 21)?;
//!     people.save(&mut mary, None).await?;
//!
//!     let adults = people
//!         .fetch(Filter::gte("age", 18))
//!         .sort("name", SortDirection::Asc)
//!         .all()
//!         .await?;
//!     println!("{} adults", adults.len());
//!
//!     println!("{}", serde_json::Value::Object(mary.to_jsonify()));
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A store can be converted into a [`DynDocumentStore`](store::DynDocumentStore) with
//! `into_dyn`, for backends selected at runtime. [`config::StoreConfig::connect`]
//! always returns one.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod config;
pub mod logging;
pub mod prelude;

pub use docmodel_core::{
    backend, collection, cursor, error, fetch, field, json, model, page, query, record, schema,
    store,
};
pub use docmodel_core::store::DocumentStore;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
