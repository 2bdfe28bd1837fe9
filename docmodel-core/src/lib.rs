//! A minimal document-mapping layer over pluggable document stores.
//!
//! This crate is the core of docmodel and provides:
//!
//! - **Field kinds** ([`field`]) - Typed fields with coercion, defaults and JSON encoding
//! - **Schemas** ([`schema`]) - Validated, once-registered model declarations
//! - **Records and models** ([`record`], [`model`]) - Attribute storage and the model traits
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Query AST, filters and sorts
//! - **Cursors and results** ([`cursor`], [`fetch`], [`page`]) - Lazy, re-windable result sets
//! - **Model collections** ([`collection`]) - Create, load, fetch and save model instances
//! - **Document store** ([`store`]) - Entry point binding models to a backend
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{field::Field, model::*, record::Record, schema::*, store::DocumentStore};
//! use bson::doc;
//!
//! #[derive(Debug)]
//! pub struct Foo(Record);
//!
//! impl Model for Foo {
//!     fn declare() -> SchemaBuilder {
//!         Schema::builder("Foo")
//!             .table("foos")
//!             .field(Field::identity("foo_id"))
//!             .field(Field::string("name").default("bar"))
//!             .field(Field::list("tags"))
//!     }
//!
//!     fn schema_cell() -> &'static SchemaCell {
//!         static SCHEMA: SchemaCell = SchemaCell::new();
//!         &SCHEMA
//!     }
//!
//!     fn from_record(record: Record) -> Self { Foo(record) }
//!     fn record(&self) -> &Record { &self.0 }
//!     fn record_mut(&mut self) -> &mut Record { &mut self.0 }
//! }
//!
//! Foo::register()?;
//! let store = DocumentStore::new(backend);
//! let foo = store.models::<Foo>()?.create(doc! {}).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod collection;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod field;
pub mod json;
pub mod model;
pub mod page;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
