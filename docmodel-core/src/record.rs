//! Per-instance attribute storage.
//!
//! A [`Record`] owns the raw attribute map of one model instance, keyed by storage
//! key. It is the only persisted state of an instance: every public field value is a
//! view computed from it through the field's [`FieldSpec`](crate::field::FieldSpec).
//!
//! Each attribute is in one of three states (see [`Slot`]). Reading an unset field
//! materializes its default into the map; writing stores the coerced value, or an
//! explicit null.

use bson::{Bson, Document, de::deserialize_from_bson};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::{
    error::{ModelError, ModelResult},
    field::{FieldSpec, bson_to_date, date_to_bson},
    schema::Schema,
};

/// State of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Never read or written.
    Unset,
    /// Explicitly set to null.
    Null,
    /// Holds a coerced value.
    Set(Bson),
}

static UNSET: Slot = Slot::Unset;

/// Whether an instance has been stored yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    New,
    Persisted,
}

#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    attrs: HashMap<String, Slot>,
    lifecycle: Lifecycle,
}

impl Record {
    /// An empty, not yet stored instance.
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            attrs: HashMap::new(),
            lifecycle: Lifecycle::New,
        }
    }

    /// Wraps a document read from the store.
    ///
    /// Keys the schema does not know are dropped; stored values are taken as-is.
    pub fn from_stored(schema: &'static Schema, document: Document) -> Self {
        let attrs = document
            .into_iter()
            .filter(|(raw_key, _)| schema.field_by_storage_key(raw_key).is_some())
            .map(|(raw_key, value)| {
                let slot = match value {
                    Bson::Null => Slot::Null,
                    value => Slot::Set(value),
                };
                (raw_key, slot)
            })
            .collect();

        Self {
            schema,
            attrs,
            lifecycle: Lifecycle::Persisted,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_new(&self) -> bool {
        self.lifecycle == Lifecycle::New
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.lifecycle = Lifecycle::Persisted;
    }

    fn spec(&self, key: &str) -> ModelResult<&'static FieldSpec> {
        let schema = self.schema;
        schema.field(key).ok_or_else(|| ModelError::UnknownField {
            model: schema.name().to_string(),
            field: key.to_string(),
        })
    }

    /// Raw state of a field, without materializing defaults.
    pub fn slot(&self, key: &str) -> ModelResult<&Slot> {
        let spec = self.spec(key)?;
        Ok(self.attrs.get(spec.storage_key()).unwrap_or(&UNSET))
    }

    /// Reads a field, filling in its default on first access.
    ///
    /// Returns `Bson::Null` for null fields and for unset fields without a default.
    pub fn get(&mut self, key: &str) -> ModelResult<Bson> {
        let spec = self.spec(key)?;

        match self.attrs.get(spec.storage_key()) {
            Some(Slot::Null) => Ok(Bson::Null),
            Some(Slot::Set(value)) => Ok(spec.coerce_out(value)),
            Some(Slot::Unset) | None => match spec.make_default()? {
                Some(value) => {
                    let out = spec.coerce_out(&value);
                    self.attrs
                        .insert(spec.storage_key().to_string(), Slot::Set(value));
                    Ok(out)
                }
                None => Ok(Bson::Null),
            },
        }
    }

    /// Reads a field and deserializes it; `None` when the field reads as null.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> ModelResult<Option<T>> {
        match self.get(key)? {
            Bson::Null => Ok(None),
            value => Ok(Some(deserialize_from_bson(value)?)),
        }
    }

    pub fn get_date(&mut self, key: &str) -> ModelResult<Option<NaiveDate>> {
        let value = self.get(key)?;
        Ok(bson_to_date(&value))
    }

    /// Writes a field. Null is stored as-is, anything else goes through strict coercion.
    pub fn set(&mut self, key: &str, value: impl Into<Bson>) -> ModelResult<()> {
        let spec = self.spec(key)?;

        let slot = match value.into() {
            Bson::Null => Slot::Null,
            value => Slot::Set(spec.coerce_in(value)?),
        };
        self.attrs.insert(spec.storage_key().to_string(), slot);

        Ok(())
    }

    pub fn set_null(&mut self, key: &str) -> ModelResult<()> {
        self.set(key, Bson::Null)
    }

    pub fn set_date(&mut self, key: &str, date: NaiveDate) -> ModelResult<()> {
        self.set(key, date_to_bson(date))
    }

    /// The identity value, if one has been set.
    pub fn id(&self) -> Option<&Bson> {
        match self.attrs.get(self.schema.identity().storage_key()) {
            Some(Slot::Set(id)) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: Bson) {
        self.attrs.insert(
            self.schema.identity().storage_key().to_string(),
            Slot::Set(id),
        );
    }

    /// Fields that have been read or written, with their read value, in declaration order.
    pub fn present(&self) -> impl Iterator<Item = (&'static FieldSpec, Bson)> + '_ {
        let schema = self.schema;
        schema
            .fields()
            .iter()
            .filter_map(move |spec| match self.attrs.get(spec.storage_key()) {
                Some(Slot::Set(value)) => Some((spec, spec.coerce_out(value))),
                Some(Slot::Null) => Some((spec, Bson::Null)),
                Some(Slot::Unset) | None => None,
            })
    }

    /// The stored form of every present attribute, keyed by storage key.
    pub fn to_document(&self) -> Document {
        self.stored_attrs(|_| true)
    }

    /// Present attributes to write on save.
    ///
    /// The identity is never part of the payload. With `allow`, only the named
    /// fields are included.
    pub(crate) fn save_payload(&self, allow: Option<&[&str]>) -> Document {
        let identity = self.schema.identity().key();
        self.stored_attrs(|spec| {
            spec.key() != identity
                && allow.is_none_or(|keys| keys.iter().any(|key| *key == spec.key()))
        })
    }

    fn stored_attrs(&self, include: impl Fn(&FieldSpec) -> bool) -> Document {
        let mut document = Document::new();
        for spec in self.schema.fields() {
            if !include(spec) {
                continue;
            }
            match self.attrs.get(spec.storage_key()) {
                Some(Slot::Set(value)) => {
                    document.insert(spec.storage_key(), value.clone());
                }
                Some(Slot::Null) => {
                    document.insert(spec.storage_key(), Bson::Null);
                }
                Some(Slot::Unset) | None => {}
            }
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::Field, schema::SchemaCell};
    use bson::doc;

    fn schema() -> &'static Schema {
        static CELL: SchemaCell = SchemaCell::new();
        CELL.register(|| {
            Schema::builder("Foo")
                .table("foo")
                .field(Field::identity("foo_id"))
                .field(Field::string("str_field"))
                .field(Field::int("int_field"))
                .field(Field::list("list_field"))
                .field(Field::date("date_field"))
                .field(Field::bool("flag").raw_key("f"))
        })
        .unwrap()
    }

    #[test]
    fn reading_fills_in_defaults() {
        let mut record = Record::new(schema());

        assert_eq!(record.slot("int_field").unwrap(), &Slot::Unset);
        assert_eq!(record.get("int_field").unwrap(), Bson::Int64(0));
        assert_eq!(record.slot("int_field").unwrap(), &Slot::Set(Bson::Int64(0)));

        // No default: stays unset.
        assert_eq!(record.get("date_field").unwrap(), Bson::Null);
        assert_eq!(record.slot("date_field").unwrap(), &Slot::Unset);
    }

    #[test]
    fn null_is_distinct_from_unset() {
        let mut record = Record::new(schema());

        record.set_null("str_field").unwrap();
        assert_eq!(record.slot("str_field").unwrap(), &Slot::Null);
        assert_eq!(record.get("str_field").unwrap(), Bson::Null);
        assert_eq!(record.to_document(), doc! { "str_field": Bson::Null });
    }

    #[test]
    fn rejected_writes_leave_the_attribute_untouched() {
        let mut record = Record::new(schema());
        record.set("int_field", 5_i64).unwrap();

        let err = record.set("int_field", "five").unwrap_err();
        assert!(matches!(err, ModelError::FieldValue(_)));
        assert_eq!(record.get_as::<i64>("int_field").unwrap(), Some(5));
    }

    #[test]
    fn unknown_fields_are_errors() {
        let mut record = Record::new(schema());
        assert!(matches!(
            record.get("nope").unwrap_err(),
            ModelError::UnknownField { .. }
        ));
        assert!(matches!(
            record.set("nope", 1_i64).unwrap_err(),
            ModelError::UnknownField { .. }
        ));
    }

    #[test]
    fn list_defaults_are_not_shared() {
        let mut a = Record::new(schema());
        let mut b = Record::new(schema());

        let mut items = a.get_as::<Vec<i64>>("list_field").unwrap().unwrap();
        items.push(1);
        a.set("list_field", bson::ser::serialize_to_bson(&items).unwrap())
            .unwrap();

        assert_eq!(a.get_as::<Vec<i64>>("list_field").unwrap(), Some(vec![1]));
        assert_eq!(b.get_as::<Vec<i64>>("list_field").unwrap(), Some(vec![]));
    }

    #[test]
    fn stored_documents_keep_known_keys_only() {
        let record = Record::from_stored(
            schema(),
            doc! { "_id": "abc", "f": true, "stray": 1, "str_field": Bson::Null },
        );

        assert!(!record.is_new());
        assert_eq!(record.id(), Some(&Bson::String("abc".into())));
        assert_eq!(record.slot("flag").unwrap(), &Slot::Set(Bson::Boolean(true)));
        assert_eq!(record.slot("str_field").unwrap(), &Slot::Null);
        assert_eq!(
            record.to_document(),
            doc! { "_id": "abc", "str_field": Bson::Null, "f": true }
        );
    }

    #[test]
    fn save_payload_excludes_identity_and_honors_allow_list() {
        let mut record = Record::new(schema());
        record.set("foo_id", "abc").unwrap();
        record.set("str_field", "x").unwrap();
        record.set("int_field", 3_i64).unwrap();

        assert_eq!(
            record.save_payload(None),
            doc! { "str_field": "x", "int_field": 3_i64 }
        );
        assert_eq!(
            record.save_payload(Some(&["int_field", "foo_id"])),
            doc! { "int_field": 3_i64 }
        );
    }

    #[test]
    fn dates_read_back_at_day_precision() {
        let mut record = Record::new(schema());
        let date = NaiveDate::from_ymd_opt(2016, 12, 1).unwrap();
        let instant = date.and_hms_micro_opt(1, 2, 3, 4).unwrap().and_utc();

        record
            .set("date_field", bson::DateTime::from_millis(instant.timestamp_millis()))
            .unwrap();
        assert_eq!(record.get_date("date_field").unwrap(), Some(date));
    }
}
