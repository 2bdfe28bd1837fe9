//! Store-backed operations of a model type.
//!
//! A [`ModelCollection`] binds a registered model type to a backend and the table
//! its schema names. It is obtained from a store:
//!
//! ```ignore
//! let people = store.models::<Person>()?;
//!
//! let mut mary = people.create(doc! { "name": "Mary", "age": 20 }).await?;
//! mary.set("age", 21)?;
//! people.save(&mut mary, None).await?;
//!
//! let again = people.get_one(mary.id().cloned().unwrap()).await?;
//! ```

use bson::{Bson, Document};
use std::marker::PhantomData;
use tracing::debug;

use crate::{
    backend::{ID_KEY, StoreBackend},
    cursor::Cursor,
    error::{ModelError, ModelResult},
    fetch::FetchResult,
    model::{Model, ModelExt},
    query::{Filter, Query},
    record::Record,
    schema::Schema,
};

#[derive(Debug)]
pub struct ModelCollection<'a, B: StoreBackend, M: Model> {
    backend: &'a B,
    schema: &'static Schema,
    _model: PhantomData<fn() -> M>,
}

impl<'a, B: StoreBackend, M: Model> ModelCollection<'a, B, M> {
    pub(crate) fn new(backend: &'a B) -> ModelResult<Self> {
        Ok(Self {
            backend,
            schema: M::schema()?,
            _model: PhantomData,
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    /// Creates and stores an instance.
    ///
    /// `payload` is keyed by field key. Fields it leaves out are filled from their
    /// defaults first. An unknown key fails before anything is stored.
    pub async fn create(&self, mut payload: Document) -> ModelResult<M> {
        for spec in self.schema.fields() {
            if payload.contains_key(spec.key()) {
                continue;
            }
            if let Some(default) = spec.make_default()? {
                payload.insert(spec.key(), default);
            }
        }

        let mut model = M::from_payload(payload)?;
        self.save(&mut model, None).await?;

        Ok(model)
    }

    /// Loads the instance stored under `id`, or `None`.
    pub async fn get_one(&self, id: impl Into<Bson>) -> ModelResult<Option<M>> {
        let id = id.into();
        if id == Bson::Null {
            return Err(ModelError::Argument(format!(
                "{}: cannot look up a null id",
                self.schema.name()
            )));
        }

        let document = self
            .backend
            .find_one(
                Filter::id(id),
                Some(self.schema.storage_keys()),
                self.table(),
            )
            .await?;

        Ok(document.map(|document| M::from_record(Record::from_stored(self.schema, document))))
    }

    /// Wraps a document already read from this model's table.
    pub fn from_raw(&self, document: Document) -> ModelResult<M> {
        if !document.contains_key(ID_KEY) {
            return Err(ModelError::Argument(format!(
                "{}: raw document has no `{ID_KEY}`",
                self.schema.name()
            )));
        }

        Ok(M::from_record(Record::from_stored(self.schema, document)))
    }

    /// A lazy result over the documents matching `query`.
    pub fn fetch(&self, query: impl Into<Query>) -> FetchResult<'a, B, M> {
        FetchResult::new(
            self.schema,
            Cursor::new(self.backend, self.table(), query.into()),
        )
    }

    /// Stores `model`: insert if new, partial update by id otherwise.
    ///
    /// With `allow`, only the named fields are written. A new instance without an
    /// identity gets a freshly generated one before the insert. Saving a persisted
    /// instance fails with [`ModelError::Save`] when no stored document has its id,
    /// even if there is nothing to write.
    pub async fn save(&self, model: &mut M, allow: Option<&[&str]>) -> ModelResult<()> {
        let record = model.record_mut();
        let payload = record.save_payload(allow);

        if record.is_new() {
            let id = match record.id() {
                Some(id) => id.clone(),
                None => {
                    let id = self
                        .schema
                        .identity()
                        .generate_id()
                        .unwrap_or_else(|| Bson::String(bson::oid::ObjectId::new().to_hex()));
                    record.set_id(id.clone());
                    id
                }
            };

            let mut document = Document::new();
            document.insert(ID_KEY, id);
            for (key, value) in payload {
                document.insert(key, value);
            }

            let inserted = self.backend.insert_one(document, self.table()).await?;
            if inserted.is_none() {
                return Err(self.save_error("insert returned no id"));
            }

            record.mark_persisted();
            debug!(model = self.schema.name(), id = ?record.id(), "inserted");
            return Ok(());
        }

        let Some(id) = record.id().cloned() else {
            return Err(self.save_error("persisted instance has no id"));
        };

        if payload.is_empty() {
            let stored = self
                .backend
                .find_one(Filter::id(id.clone()), Some(Vec::new()), self.table())
                .await?;
            if stored.is_none() {
                return Err(self.save_error(&format!("no document matched id {id}")));
            }

            debug!(model = self.schema.name(), %id, "nothing to save");
            return Ok(());
        }

        let matched = self
            .backend
            .update_one(Filter::id(id.clone()), payload, self.table())
            .await?;
        if matched == 0 {
            return Err(self.save_error(&format!("no document matched id {id}")));
        }

        debug!(model = self.schema.name(), %id, "updated");
        Ok(())
    }

    fn save_error(&self, reason: &str) -> ModelError {
        ModelError::Save {
            model: self.schema.name().to_string(),
            reason: reason.to_string(),
        }
    }
}
