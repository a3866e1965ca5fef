use serde_json::{Map, Value};

use crate::fields::{normalize_custom_fields, CustomFields, FieldValue};

pub const RAW_CUSTOM_FIELDS_KEY: &str = "customFields";
pub const CUSTOM_FIELDS_KEY: &str = "custom_fields";
pub const RAW_CUSTOM_FIELDS_COPY_KEY: &str = "_raw_custom_fields";

#[derive(Clone, Debug, PartialEq)]
pub struct Issue {
    raw: Map<String, Value>,
    custom_fields: Option<CustomFields>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueComment {
    pub id: Option<String>,
    pub text: String,
    pub created: Option<i64>,
    pub author_login: Option<String>,
    pub author_name: Option<String>,
}

impl Issue {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        Self {
            raw,
            custom_fields: None,
        }
    }

    pub fn normalized(raw: Map<String, Value>) -> Self {
        let custom_fields = raw.get(RAW_CUSTOM_FIELDS_KEY).map(normalize_custom_fields);
        Self { raw, custom_fields }
    }

    pub fn from_value(value: Value, normalize: bool) -> Self {
        let raw = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if normalize {
            Self::normalized(raw)
        } else {
            Self::from_raw(raw)
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("idReadable").or_else(|| self.str_field("id"))
    }

    pub fn summary(&self) -> Option<&str> {
        self.str_field("summary")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    pub fn created(&self) -> Option<i64> {
        self.timestamp_field("created")
    }

    pub fn updated(&self) -> Option<i64> {
        self.timestamp_field("updated")
    }

    pub fn resolved(&self) -> Option<i64> {
        self.timestamp_field("resolved")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn is_normalized(&self) -> bool {
        self.custom_fields.is_some()
    }

    pub fn custom_fields(&self) -> Option<&CustomFields> {
        self.custom_fields.as_ref()
    }

    pub fn custom_field(&self, name: &str) -> Option<&FieldValue> {
        self.custom_fields.as_ref()?.get(name)
    }

    pub fn custom_field_text(&self, name: &str) -> Option<String> {
        self.custom_field(name).and_then(FieldValue::display)
    }

    pub fn raw_custom_fields(&self) -> Option<&Value> {
        self.raw.get(RAW_CUSTOM_FIELDS_KEY)
    }

    pub fn comments(&self) -> Vec<IssueComment> {
        let Some(items) = self.raw.get("comments").and_then(Value::as_array) else {
            return Vec::new();
        };
        items.iter().map(into_issue_comment).collect()
    }

    pub fn to_json(&self) -> Value {
        let mut out = self.raw.clone();
        if let Some(fields) = &self.custom_fields {
            let flattened = fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect::<Map<_, _>>();
            out.insert(CUSTOM_FIELDS_KEY.to_string(), Value::Object(flattened));
            out.insert(
                RAW_CUSTOM_FIELDS_COPY_KEY.to_string(),
                self.raw_custom_fields().cloned().unwrap_or(Value::Null),
            );
        }
        Value::Object(out)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    fn timestamp_field(&self, key: &str) -> Option<i64> {
        self.raw.get(key).and_then(Value::as_i64)
    }
}

fn into_issue_comment(value: &Value) -> IssueComment {
    let author = value.get("author");
    let author_str = |key: &str| {
        author
            .and_then(|author| author.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    IssueComment {
        id: value.get("id").and_then(Value::as_str).map(str::to_string),
        text: value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created: value.get("created").and_then(Value::as_i64),
        author_login: author_str("login"),
        author_name: author_str("fullName"),
    }
}
