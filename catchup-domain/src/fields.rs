use std::collections::BTreeMap;

use serde_json::{Map, Value};

const UNWRAP_KEYS: [&str; 3] = ["name", "login", "text"];

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Scalar(Value),
    Object(Map<String, Value>),
    List(Vec<Value>),
}

pub type CustomFields = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn from_raw(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Object(object) => match unwrap_object(object) {
                Some(inner) => FieldValue::Scalar(inner.clone()),
                None => FieldValue::Object(object.clone()),
            },
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(object) => unwrap_object(object).unwrap_or(item).clone(),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            scalar => FieldValue::Scalar(scalar.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Object(object) => Value::Object(object.clone()),
            FieldValue::List(items) => Value::Array(items.clone()),
        }
    }

    pub fn display(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Scalar(value) => Some(display_value(value)),
            FieldValue::Object(object) => Some(Value::Object(object.clone()).to_string()),
            FieldValue::List(items) => Some(
                items
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }
}

/// Never fails: a non-list gives an empty map and entries without a `name` are keyed by "".
pub fn normalize_custom_fields(raw: &Value) -> CustomFields {
    let Some(entries) = raw.as_array() else {
        return CustomFields::new();
    };

    entries
        .iter()
        .map(|entry| {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let value = entry
                .get("value")
                .map(FieldValue::from_raw)
                .unwrap_or(FieldValue::Null);
            (name, value)
        })
        .collect()
}

fn unwrap_object(object: &Map<String, Value>) -> Option<&Value> {
    UNWRAP_KEYS.iter().find_map(|key| object.get(*key))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
