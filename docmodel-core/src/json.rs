//! Conversions between stored BSON values and JSON-safe values.
//!
//! The external representation of a model is plain JSON. Values that have no
//! direct JSON counterpart are flattened to strings: object ids become their hex
//! form and instants become RFC 3339 timestamps. Fields with a richer external
//! format (dates) do their own encoding on top of this.

use bson::{Bson, Document};
use chrono::DateTime;
use serde_json::{Map, Number, Value};

/// Converts a BSON value into a JSON value.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Number((*i).into()),
        Bson::Int64(i) => Value::Number((*i).into()),
        Bson::Double(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_json(doc)),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => DateTime::from_timestamp_millis(dt.timestamp_millis())
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

/// Converts a BSON document into a JSON object.
pub fn document_to_json(doc: &Document) -> Map<String, Value> {
    doc.iter()
        .map(|(key, value)| (key.clone(), bson_to_json(value)))
        .collect()
}

/// Converts a JSON value into a BSON value.
///
/// Integral numbers become `Int64` when they fit, everything else numeric becomes `Double`.
pub fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(json_to_document(map)),
    }
}

/// Converts a JSON object into a BSON document.
pub fn json_to_document(map: &Map<String, Value>) -> Document {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.insert(key.clone(), json_to_bson(value));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn nested_values_survive_a_round_trip() {
        let original = doc! {
            "name": "Mary",
            "age": 20_i64,
            "tags": ["a", "b"],
            "point": { "x": 1_i64, "y": 2_i64 },
            "active": true,
            "missing": Bson::Null,
        };

        let json = document_to_json(&original);
        assert_eq!(json_to_document(&json), original);
    }

    #[test]
    fn non_json_values_are_flattened_to_strings() {
        let oid = ObjectId::new();
        assert_eq!(bson_to_json(&Bson::ObjectId(oid)), json!(oid.to_hex()));

        let instant = Bson::DateTime(bson::DateTime::from_millis(0));
        assert_eq!(bson_to_json(&instant), json!("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn fractional_numbers_become_doubles() {
        assert_eq!(json_to_bson(&json!(1.5)), Bson::Double(1.5));
        assert_eq!(json_to_bson(&json!(3)), Bson::Int64(3));
    }
}
