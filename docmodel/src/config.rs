//! Configuration-driven store construction.
//!
//! ```ignore
//! use docmodel::config::StoreConfig;
//!
//! let config = StoreConfig::from_json(r#"{ "backend": "memory" }"#)?;
//! let store = config.connect().await?;
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};
use docmodel_memory::InMemoryStore;

pub const BACKEND_ENV: &str = "DOCMODEL_BACKEND";
pub const MONGODB_URI_ENV: &str = "DOCMODEL_MONGODB_URI";
pub const MONGODB_DATABASE_ENV: &str = "DOCMODEL_MONGODB_DATABASE";

/// Which storage backend to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Mongodb { uri: String, database: String },
}

impl StoreConfig {
    pub fn from_json(input: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Reads `DOCMODEL_BACKEND` (`memory` when unset) and, for MongoDB,
    /// `DOCMODEL_MONGODB_URI` and `DOCMODEL_MONGODB_DATABASE`.
    pub fn from_env() -> DocumentStoreResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let backend = lookup(BACKEND_ENV).unwrap_or_else(|| "memory".to_string());

        match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreConfig::Memory),
            "mongodb" => {
                let required = |key: &str| {
                    lookup(key).ok_or_else(|| {
                        DocumentStoreError::Initialization(format!("{key} is not set"))
                    })
                };

                Ok(StoreConfig::Mongodb {
                    uri: required(MONGODB_URI_ENV)?,
                    database: required(MONGODB_DATABASE_ENV)?,
                })
            }
            other => Err(DocumentStoreError::Initialization(format!(
                "unknown backend `{other}` in {BACKEND_ENV}"
            ))),
        }
    }

    /// Builds the configured backend behind a [`DynDocumentStore`].
    pub async fn connect(&self) -> DocumentStoreResult<DynDocumentStore> {
        match self {
            StoreConfig::Memory => {
                debug!("using in-memory store");
                Ok(DocumentStore::new(InMemoryStore::new()).into_dyn())
            }
            #[cfg(feature = "mongodb")]
            StoreConfig::Mongodb { uri, database } => {
                use docmodel_core::backend::StoreBackendBuilder;
                use docmodel_mongodb::MongoDbStore;

                let backend = MongoDbStore::builder(uri, database).build().await?;
                Ok(DocumentStore::new(backend).into_dyn())
            }
            #[cfg(not(feature = "mongodb"))]
            StoreConfig::Mongodb { .. } => Err(DocumentStoreError::Initialization(
                "the mongodb backend requires the `mongodb` feature".to_string(),
            )),
        }
    }
}
