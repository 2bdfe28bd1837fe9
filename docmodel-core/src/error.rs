//! Error types and result types for the document-mapping layer.
//!
//! Two layers of errors exist:
//!
//! - [`DocumentStoreError`] is raised by storage gateways (backends) and by the
//!   (de)serialization helpers that sit between them and the model layer.
//! - [`ModelError`] is what model operations return. It wraps store errors and adds
//!   the schema, field, persistence and parsing failures of the mapping layer itself.
//!
//! All model errors propagate to the caller undecorated. The only place errors are
//! swallowed is the tolerant decode path of the external representation, which logs
//! and skips the offending field instead.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for storage gateway operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// A schema failed its invariant checks while a model type was being registered.
///
/// These are fatal: a model whose declaration is rejected never becomes usable,
/// so no CRUD operation can run against a malformed schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaDeclareError {
    /// The model declares no identity field.
    #[error("model {model}: missing identity field")]
    MissingIdentity { model: String },
    /// The model declares more than one identity field.
    #[error("model {model}: duplicate identity field `{second}` (already declared `{first}`)")]
    DuplicateIdentity {
        model: String,
        first: String,
        second: String,
    },
    /// The model has no table (collection) name.
    #[error("model {model}: missing table")]
    MissingTable { model: String },
    /// Two fields share the same public key.
    #[error("model {model}: field `{field}` declared twice")]
    DuplicateField { model: String, field: String },
    /// Two fields share the same storage key.
    #[error("model {model}: storage key `{raw_key}` used by more than one field")]
    DuplicateRawKey { model: String, raw_key: String },
    /// A storage key cannot be used as a document key.
    #[error("model {model}: invalid storage key `{raw_key}` for field `{field}`")]
    InvalidRawKey {
        model: String,
        field: String,
        raw_key: String,
    },
    /// The identity field must be stored under the store's identity key.
    #[error("model {model}: identity field `{field}` must be stored as `{expected}`")]
    IdentityRawKey {
        model: String,
        field: String,
        expected: &'static str,
    },
}

/// A typed field rejected a value during strict write-time coercion.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field `{field}` ({kind}) rejected value: {reason}")]
pub struct FieldValueError {
    /// Public key of the field.
    pub field: String,
    /// Name of the field variant, e.g. `"date"`.
    pub kind: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

/// Errors returned by model operations.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Declare(#[from] SchemaDeclareError),
    #[error(transparent)]
    FieldValue(#[from] FieldValueError),
    /// Construction was given a key the schema does not declare.
    #[error("model {model} has no field `{field}`")]
    UnknownField { model: String, field: String },
    /// The store did not acknowledge an insert or an update matched nothing.
    #[error("save failed for model {model}: {reason}")]
    Save { model: String, reason: String },
    /// An external payload could not be parsed into this model.
    #[error("cannot parse payload as {model}: {reason}")]
    Parser { model: String, reason: String },
    /// An operation was called with an unusable argument.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// The model type was used before its schema was registered.
    #[error("model {0} used before registration")]
    Unregistered(&'static str),
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Store(err.into())
    }
}

impl From<SerdeJsonError> for ModelError {
    fn from(err: SerdeJsonError) -> Self {
        ModelError::Store(err.into())
    }
}
