//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    backend::{DynStoreBackend, ID_KEY, StoreBackend, StoreBackendBuilder},
    collection::ModelCollection,
    cursor::Cursor,
    error::{
        DocumentStoreError, DocumentStoreResult, FieldValueError, ModelError, ModelResult,
        SchemaDeclareError,
    },
    fetch::FetchResult,
    field::{Field, FieldKind, FieldSpec, IdGenerator},
    model::{Model, ModelExt, TYPE_TAG_KEY},
    page::{Page, PaginationParams},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    record::{Lifecycle, Record},
    schema::{Schema, SchemaBuilder, SchemaCell},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore, IntoStaticDocumentStore},
};
