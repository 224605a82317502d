//! JSON ↔ Firestore value mapping.
//!
//! Documents round-trip through `serde_json::Value`, so any model type
//! that serializes to JSON can be stored without per-field plumbing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// Firestore sends integers as strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// The document id: the last path segment of the resource name.
    pub fn doc_id(&self) -> Option<&str> {
        self.name.as_deref()?.rsplit('/').next()
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

/// Convert a JSON value into a Firestore value.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::NullValue(()),
        serde_json::Value::Bool(b) => Value::BooleanValue(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Value::IntegerValue(u.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::StringValue(s.clone()),
        serde_json::Value::Array(items) => Value::ArrayValue(ArrayValue {
            values: Some(items.iter().map(json_to_value).collect()),
        }),
        serde_json::Value::Object(map) => Value::MapValue(MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            ),
        }),
    }
}

/// Convert a Firestore value back into JSON.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::NullValue(()) => serde_json::Value::Null,
        Value::BooleanValue(b) => serde_json::Value::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map(serde_json::Value::from)
            .or_else(|_| s.parse::<u64>().map(serde_json::Value::from))
            .unwrap_or(serde_json::Value::Null),
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::TimestampValue(s) | Value::StringValue(s) => serde_json::Value::String(s.clone()),
        Value::ArrayValue(array) => serde_json::Value::Array(
            array
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(value_to_json)
                .collect(),
        ),
        Value::MapValue(map) => serde_json::Value::Object(
            map.fields
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_json(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
    }
}

/// Convert a JSON object into document fields.
///
/// The input must serialize to a JSON object; anything else is a
/// programming error on the repository side.
pub fn json_to_fields(json: &serde_json::Value) -> Option<HashMap<String, Value>> {
    json.as_object().map(|map| {
        map.iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect()
    })
}

/// Convert a document back into a JSON object.
pub fn document_to_json(document: &Document) -> serde_json::Value {
    let fields = document.fields.as_ref();
    serde_json::Value::Object(
        fields
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_json(v)))
                    .collect()
            })
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trips_through_firestore_values() {
        let original = json!({
            "name": "Mythology",
            "status": "discovered",
            "views": 123456789u64,
            "avg": 1.5,
            "flag": true,
            "nothing": null,
            "tags": ["a", "b"],
            "nested": {"series": [{"name": "X But Y", "count": 3}]}
        });

        let fields = json_to_fields(&original).unwrap();
        let document = Document::new(fields);
        let back = document_to_json(&document);

        assert_eq!(back, original);
    }

    #[test]
    fn integers_become_string_values() {
        let value = json_to_value(&json!(42));
        match value {
            Value::IntegerValue(s) => assert_eq!(s, "42"),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn doc_id_is_last_path_segment() {
        let document = Document {
            name: Some("projects/p/databases/(default)/documents/projects/abc-123".to_string()),
            fields: None,
            create_time: None,
            update_time: None,
        };
        assert_eq!(document.doc_id(), Some("abc-123"));
    }

    #[test]
    fn non_object_json_yields_no_fields() {
        assert!(json_to_fields(&json!("just a string")).is_none());
    }
}
