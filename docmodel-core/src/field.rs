//! Field descriptors: one named, typed attribute of a model.
//!
//! A [`FieldSpec`] binds a public key and a storage key to a [`FieldKind`], the
//! variant that decides how values are coerced on write, projected on read, and
//! encoded to or decoded from the external JSON representation. Field specs are
//! declared through the [`Field`] constructors and handed to a
//! [`SchemaBuilder`](crate::schema::SchemaBuilder).
//!
//! ```ignore
//! use docmodel_core::field::Field;
//!
//! let fields = vec![
//!     Field::identity("foo_id"),
//!     Field::string("name").default("anonymous"),
//!     Field::int("age"),
//!     Field::date("birthday"),
//!     Field::list("tags"),
//!     Field::structured::<Point>("point").raw_key("pt"),
//! ];
//! ```
//!
//! Coercion on write is strict: a value of the wrong shape is rejected with a
//! [`FieldValueError`] rather than stored. Decoding external input is the tolerant
//! side, and callers decide what to do when it fails.

use bson::{Bson, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{any::type_name, fmt, sync::Arc};

use crate::{
    backend::ID_KEY,
    error::FieldValueError,
    json::{bson_to_json, json_to_bson},
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// External format of date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Behavior of one field variant.
///
/// Implementations only transform values; they never touch the instance that owns
/// the field. Rejections are reported as a human-readable reason and wrapped into a
/// [`FieldValueError`] by the owning [`FieldSpec`].
pub trait FieldKind: Send + Sync + fmt::Debug {
    /// Short name of the variant, used in error messages.
    fn name(&self) -> &'static str;

    /// Whether this variant marks the identity field of a schema.
    fn is_identity(&self) -> bool {
        false
    }

    /// Default produced when a field is read before it was ever written.
    fn default_value(&self) -> Option<Bson> {
        None
    }

    /// Coerces a caller-supplied (non-null) value into its stored form.
    fn coerce_in(&self, value: Bson) -> Result<Bson, String>;

    /// Projects a stored (non-null) value into the value returned on read.
    fn coerce_out(&self, stored: &Bson) -> Bson {
        stored.clone()
    }

    /// Encodes a read value into the external representation.
    ///
    /// `None` omits the field from the external representation.
    fn encode(&self, value: &Bson) -> Option<Value> {
        Some(bson_to_json(value))
    }

    /// Decodes an external value; the result still goes through [`coerce_in`](Self::coerce_in).
    fn decode(&self, value: &Value) -> Result<Bson, String> {
        Ok(json_to_bson(value))
    }

    /// Mints a fresh identity value. Only identity variants return `Some`.
    fn generate_id(&self) -> Option<Bson> {
        None
    }
}

/// How identity values are minted when an instance is first inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdGenerator {
    /// Hex string of a fresh BSON object id.
    #[default]
    ObjectId,
    /// Hyphenated UUID v4 string.
    Uuid,
}

impl IdGenerator {
    pub fn generate(&self) -> String {
        match self {
            IdGenerator::ObjectId => ObjectId::new().to_hex(),
            IdGenerator::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug)]
pub struct IdentityKind {
    generator: IdGenerator,
}

impl FieldKind for IdentityKind {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        Ok(value)
    }

    fn generate_id(&self) -> Option<Bson> {
        Some(Bson::String(self.generator.generate()))
    }
}

#[derive(Debug)]
pub struct StringKind;

impl FieldKind for StringKind {
    fn name(&self) -> &'static str {
        "string"
    }

    fn default_value(&self) -> Option<Bson> {
        Some(Bson::String(String::new()))
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        match value {
            Bson::String(s) => Ok(Bson::String(s)),
            Bson::Int32(i) => Ok(Bson::String(i.to_string())),
            Bson::Int64(i) => Ok(Bson::String(i.to_string())),
            Bson::Double(f) => Ok(Bson::String(f.to_string())),
            Bson::Boolean(b) => Ok(Bson::String(b.to_string())),
            Bson::ObjectId(oid) => Ok(Bson::String(oid.to_hex())),
            other => Err(format!("cannot stringify {:?}", other.element_type())),
        }
    }
}

#[derive(Debug)]
pub struct BoolKind;

impl FieldKind for BoolKind {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn default_value(&self) -> Option<Bson> {
        Some(Bson::Boolean(false))
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        let truthy = match &value {
            Bson::Boolean(b) => *b,
            Bson::Int32(i) => *i != 0,
            Bson::Int64(i) => *i != 0,
            Bson::Double(f) => *f != 0.0,
            Bson::String(s) => !s.is_empty(),
            Bson::Array(items) => !items.is_empty(),
            Bson::Document(doc) => !doc.is_empty(),
            Bson::Null | Bson::Undefined => false,
            _ => true,
        };

        Ok(Bson::Boolean(truthy))
    }
}

#[derive(Debug)]
pub struct IntKind;

impl FieldKind for IntKind {
    fn name(&self) -> &'static str {
        "int"
    }

    fn default_value(&self) -> Option<Bson> {
        Some(Bson::Int64(0))
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        match value {
            Bson::Int32(i) => Ok(Bson::Int64(i64::from(i))),
            Bson::Int64(i) => Ok(Bson::Int64(i)),
            Bson::Boolean(b) => Ok(Bson::Int64(i64::from(b))),
            Bson::Double(f) if f.is_finite() && f.trunc().abs() < i64::MAX as f64 => {
                Ok(Bson::Int64(f.trunc() as i64))
            }
            Bson::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Bson::Int64)
                .map_err(|_| format!("`{s}` is not an integer")),
            other => Err(format!("cannot convert {:?} to an integer", other.element_type())),
        }
    }
}

/// Calendar dates, stored as an instant at midnight UTC.
///
/// Time-of-day is always discarded on write.
#[derive(Debug)]
pub struct DateKind;

impl FieldKind for DateKind {
    fn name(&self) -> &'static str {
        "date"
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        match value {
            Bson::DateTime(dt) => Ok(Bson::DateTime(truncate_to_day(dt))),
            other => Err(format!(
                "expected a date or an instant, got {:?}",
                other.element_type()
            )),
        }
    }

    fn encode(&self, value: &Bson) -> Option<Value> {
        bson_to_date(value).map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
    }

    fn decode(&self, value: &Value) -> Result<Bson, String> {
        match value {
            Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(date_to_bson)
                .map_err(|e| format!("`{s}` is not a {DATE_FORMAT} date: {e}")),
            other => Err(format!("expected a {DATE_FORMAT} string, got {other}")),
        }
    }
}

#[derive(Debug)]
pub struct ListKind;

impl FieldKind for ListKind {
    fn name(&self) -> &'static str {
        "list"
    }

    fn default_value(&self) -> Option<Bson> {
        Some(Bson::Array(Vec::new()))
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        match value {
            Bson::Array(items) => Ok(Bson::Array(items.into_iter().collect())),
            other => Err(format!("expected a sequence, got {:?}", other.element_type())),
        }
    }
}

/// A nested record of fixed shape, stored as a field map.
///
/// The shape is a serde type: writes must deserialize into it, and the stored map
/// is the record re-serialized, so unknown or missing members never reach the store.
pub struct StructuredKind {
    record: &'static str,
    validate: fn(Bson) -> Result<Bson, String>,
}

impl StructuredKind {
    pub fn of<T: Serialize + DeserializeOwned>() -> Self {
        Self {
            record: type_name::<T>(),
            validate: validate_record::<T>,
        }
    }

    /// Name of the record type this field reconstructs.
    pub fn record(&self) -> &'static str {
        self.record
    }
}

impl fmt::Debug for StructuredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredKind")
            .field("record", &self.record)
            .finish()
    }
}

impl FieldKind for StructuredKind {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn coerce_in(&self, value: Bson) -> Result<Bson, String> {
        match value {
            Bson::Document(_) => match (self.validate)(value)? {
                doc @ Bson::Document(_) => Ok(doc),
                other => Err(format!("{} is not stored as a map: {other}", self.record)),
            },
            other => Err(format!(
                "expected a {} record, got {:?}",
                self.record,
                other.element_type()
            )),
        }
    }

    fn coerce_out(&self, stored: &Bson) -> Bson {
        match stored {
            Bson::Document(_) => stored.clone(),
            _ => Bson::Null,
        }
    }

    fn decode(&self, value: &Value) -> Result<Bson, String> {
        match value {
            Value::Object(_) => Ok(json_to_bson(value)),
            other => Err(format!("expected an object for {}, got {other}", self.record)),
        }
    }
}

fn validate_record<T: Serialize + DeserializeOwned>(value: Bson) -> Result<Bson, String> {
    let record: T = deserialize_from_bson(value).map_err(|e| e.to_string())?;
    serialize_to_bson(&record).map_err(|e| e.to_string())
}

fn truncate_to_day(dt: bson::DateTime) -> bson::DateTime {
    let millis = dt.timestamp_millis();
    bson::DateTime::from_millis(millis - millis.rem_euclid(MILLIS_PER_DAY))
}

/// Stored form of a calendar date: the instant at midnight UTC.
pub fn date_to_bson(date: NaiveDate) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(
        date.and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis(),
    ))
}

/// Calendar date of a stored instant, if the value is one.
pub fn bson_to_date(value: &Bson) -> Option<NaiveDate> {
    match value {
        Bson::DateTime(dt) => {
            DateTime::from_timestamp_millis(dt.timestamp_millis()).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

/// Where a field's default comes from.
#[derive(Clone)]
enum DefaultSource {
    /// The variant's own default.
    Kind,
    /// No default: the field stays unset until written.
    Absent,
    Value(Bson),
    Producer(Arc<dyn Fn() -> Bson + Send + Sync>),
}

impl fmt::Debug for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSource::Kind => f.write_str("Kind"),
            DefaultSource::Absent => f.write_str("Absent"),
            DefaultSource::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultSource::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Declaration of one field: public key, storage key, variant and default.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    key: String,
    raw_key: String,
    kind: Arc<dyn FieldKind>,
    default: DefaultSource,
}

impl FieldSpec {
    /// Declares a field with a custom variant. The storage key defaults to `key`.
    pub fn new(key: impl Into<String>, kind: impl FieldKind + 'static) -> Self {
        let key = key.into();
        Self {
            raw_key: key.clone(),
            key,
            kind: Arc::new(kind),
            default: DefaultSource::Kind,
        }
    }

    /// Stores the field under a different document key.
    pub fn raw_key(mut self, raw_key: impl Into<String>) -> Self {
        self.raw_key = raw_key.into();
        self
    }

    /// Uses a fixed default value instead of the variant's default.
    pub fn default(mut self, value: impl Into<Bson>) -> Self {
        self.default = DefaultSource::Value(value.into());
        self
    }

    /// Produces the default on demand, once per instance.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Bson + Send + Sync + 'static,
    {
        self.default = DefaultSource::Producer(Arc::new(producer));
        self
    }

    /// Leaves the field unset until it is written.
    pub fn no_default(mut self) -> Self {
        self.default = DefaultSource::Absent;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage_key(&self) -> &str {
        &self.raw_key
    }

    pub fn kind(&self) -> &dyn FieldKind {
        &*self.kind
    }

    pub fn is_identity(&self) -> bool {
        self.kind.is_identity()
    }

    /// Materializes and coerces this field's default, if it has one.
    pub fn make_default(&self) -> Result<Option<Bson>, FieldValueError> {
        let value = match &self.default {
            DefaultSource::Kind => self.kind.default_value(),
            DefaultSource::Absent => None,
            DefaultSource::Value(value) => Some(value.clone()),
            DefaultSource::Producer(producer) => Some(producer()),
        };

        match value {
            None | Some(Bson::Null) => Ok(None),
            Some(value) => self.coerce_in(value).map(Some),
        }
    }

    /// Strict write-time coercion of a non-null value.
    pub fn coerce_in(&self, value: Bson) -> Result<Bson, FieldValueError> {
        self.kind
            .coerce_in(value)
            .map_err(|reason| self.rejection(reason))
    }

    pub fn coerce_out(&self, stored: &Bson) -> Bson {
        self.kind.coerce_out(stored)
    }

    /// External form of a read value; `None` omits the field.
    pub fn encode(&self, value: &Bson) -> Option<Value> {
        match value {
            Bson::Null => Some(Value::Null),
            value => self.kind.encode(value),
        }
    }

    /// Decodes an external value. JSON `null` decodes to `Bson::Null` for every variant.
    pub fn decode(&self, value: &Value) -> Result<Bson, FieldValueError> {
        match value {
            Value::Null => Ok(Bson::Null),
            value => self
                .kind
                .decode(value)
                .map_err(|reason| self.rejection(reason)),
        }
    }

    pub fn generate_id(&self) -> Option<Bson> {
        self.kind.generate_id()
    }

    fn rejection(&self, reason: String) -> FieldValueError {
        FieldValueError {
            field: self.key.clone(),
            kind: self.kind.name(),
            reason,
        }
    }
}

/// Constructors for the built-in field variants.
pub struct Field;

impl Field {
    /// The identity field, stored under the store's identity key.
    pub fn identity(key: impl Into<String>) -> FieldSpec {
        Self::identity_with(key, IdGenerator::default())
    }

    pub fn identity_with(key: impl Into<String>, generator: IdGenerator) -> FieldSpec {
        FieldSpec::new(key, IdentityKind { generator }).raw_key(ID_KEY)
    }

    /// Stringifies scalars. Defaults to `""`.
    pub fn string(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, StringKind)
    }

    /// Stores truthiness. Defaults to `false`.
    pub fn bool(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, BoolKind)
    }

    /// Converts to a 64-bit integer, accepting numeric strings. Defaults to `0`.
    pub fn int(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, IntKind)
    }

    /// A calendar date at day precision. No default.
    pub fn date(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, DateKind)
    }

    /// An ordered sequence. Defaults to a fresh empty sequence per instance.
    pub fn list(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, ListKind)
    }

    /// A nested record of type `T`. No default.
    pub fn structured<T: Serialize + DeserializeOwned>(key: impl Into<String>) -> FieldSpec {
        FieldSpec::new(key, StructuredKind::of::<T>())
    }
}
