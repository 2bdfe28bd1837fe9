//! Model traits.
//!
//! A concrete record type declares its schema and wraps a [`Record`] by implementing
//! [`Model`]. Everything else comes from [`ModelExt`], which is implemented for every
//! model: registration, field access, and the external (JSON) representation.
//! Operations that touch the store live on
//! [`ModelCollection`](crate::collection::ModelCollection).
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{field::Field, model::{Model, ModelExt}, record::Record, schema::*};
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
//!     fn from_record(record: Record) -> Self {
//!         Person(record)
//!     }
//!
//!     fn record(&self) -> &Record {
//!         &self.0
//!     }
//!
//!     fn record_mut(&mut self) -> &mut Record {
//!         &mut self.0
//!     }
//! }
//!
//! Person::register()?;
//! let mut mary = Person::new()?;
//! mary.set("name", "Mary")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use bson::{Bson, Document};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::type_name;
use tracing::warn;

use crate::{
    error::{ModelError, ModelResult, SchemaDeclareError},
    record::Record,
    schema::{Schema, SchemaBuilder, SchemaCell},
};

/// Key of the type tag in the external representation.
pub const TYPE_TAG_KEY: &str = "__class__";

/// A typed view over a [`Record`] with a registered schema.
pub trait Model: Sized + Send + Sync + 'static {
    /// Declares the schema. Evaluated once, by [`ModelExt::register`].
    fn declare() -> SchemaBuilder;

    /// The slot holding this type's registered schema.
    fn schema_cell() -> &'static SchemaCell;

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;
}

pub trait ModelExt: Model {
    /// Registers the schema, validating it. Idempotent.
    fn register() -> Result<&'static Schema, SchemaDeclareError> {
        Self::schema_cell().register(Self::declare)
    }

    /// The registered schema.
    fn schema() -> ModelResult<&'static Schema> {
        Self::schema_cell()
            .get()
            .ok_or(ModelError::Unregistered(type_name::<Self>()))
    }

    /// An empty, new instance.
    fn new() -> ModelResult<Self> {
        Ok(Self::from_record(Record::new(Self::schema()?)))
    }

    /// A new instance with the given field values, keyed by field key.
    ///
    /// Fails before setting anything if `payload` names a field the schema lacks.
    fn from_payload(payload: Document) -> ModelResult<Self> {
        let schema = Self::schema()?;

        if let Some(unknown) = payload.keys().find(|key| schema.field(key).is_none()) {
            return Err(ModelError::UnknownField {
                model: schema.name().to_string(),
                field: unknown.clone(),
            });
        }

        let mut record = Record::new(schema);
        for (key, value) in payload {
            record.set(&key, value)?;
        }

        Ok(Self::from_record(record))
    }

    fn is_new(&self) -> bool {
        self.record().is_new()
    }

    fn id(&self) -> Option<&Bson> {
        self.record().id()
    }

    fn get(&mut self, key: &str) -> ModelResult<Bson> {
        self.record_mut().get(key)
    }

    fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> ModelResult<Option<T>> {
        self.record_mut().get_as(key)
    }

    fn get_date(&mut self, key: &str) -> ModelResult<Option<NaiveDate>> {
        self.record_mut().get_date(key)
    }

    fn set(&mut self, key: &str, value: impl Into<Bson>) -> ModelResult<()> {
        self.record_mut().set(key, value)
    }

    fn set_null(&mut self, key: &str) -> ModelResult<()> {
        self.record_mut().set_null(key)
    }

    fn set_date(&mut self, key: &str, date: NaiveDate) -> ModelResult<()> {
        self.record_mut().set_date(key, date)
    }

    /// External representation: the type tag plus every present field, encoded.
    ///
    /// Fields never read or written are omitted, as are fields whose encoder
    /// declines the stored value.
    fn to_jsonify(&self) -> Map<String, Value> {
        let record = self.record();
        let mut payload = Map::new();
        payload.insert(
            TYPE_TAG_KEY.to_string(),
            Value::String(record.schema().name().to_string()),
        );

        for (spec, value) in record.present() {
            if let Some(encoded) = spec.encode(&value) {
                payload.insert(spec.key().to_string(), encoded);
            }
        }

        payload
    }

    /// Applies the fields present in `payload`, optionally only those in `allow`.
    ///
    /// A value that cannot be decoded is logged and skipped. A decoded value the
    /// field rejects is an error.
    fn update_from_jsonify(
        &mut self,
        payload: &Map<String, Value>,
        allow: Option<&[&str]>,
    ) -> ModelResult<&mut Self> {
        let schema = self.record().schema();

        let mut updates = Vec::new();
        for spec in schema.fields() {
            if allow.is_some_and(|keys| !keys.contains(&spec.key())) {
                continue;
            }
            let Some(raw) = payload.get(spec.key()) else {
                continue;
            };

            match spec.decode(raw) {
                Ok(Bson::Null) => updates.push((spec.key(), Bson::Null)),
                Ok(value) => updates.push((spec.key(), spec.coerce_in(value)?)),
                Err(err) => warn!(model = schema.name(), error = %err, "skipping undecodable field"),
            }
        }

        // Every value is coerced before any is written.
        for (key, value) in updates {
            self.record_mut().set(key, value)?;
        }

        Ok(self)
    }

    /// Parses an external representation produced by [`to_jsonify`](Self::to_jsonify).
    ///
    /// The type tag must name this model. The result is a new instance.
    fn from_jsonify(payload: &Map<String, Value>) -> ModelResult<Self> {
        let schema = Self::schema()?;

        match payload.get(TYPE_TAG_KEY) {
            Some(Value::String(tag)) if tag == schema.name() => {}
            other => {
                return Err(ModelError::Parser {
                    model: schema.name().to_string(),
                    reason: match other {
                        Some(tag) => format!("type tag {tag} does not match"),
                        None => format!("missing `{TYPE_TAG_KEY}` type tag"),
                    },
                });
            }
        }

        let mut record = Record::new(schema);
        for spec in schema.fields() {
            let Some(raw) = payload.get(spec.key()) else {
                continue;
            };

            match spec.decode(raw) {
                Ok(value) => record.set(spec.key(), value)?,
                Err(err) => warn!(model = schema.name(), error = %err, "skipping undecodable field"),
            }
        }

        Ok(Self::from_record(record))
    }
}

impl<M: Model> ModelExt for M {}
