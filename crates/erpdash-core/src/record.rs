//! Opaque API records
//!
//! A [`Record`] is one JSON object from the upstream API. The tree builder
//! and the table pipeline work on records directly so that every page can
//! share them; typed schemas in [`crate::models`] are decoded from records
//! at the boundary.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Identity of a record, normalized so `1` and `"1"` compare equal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Read a key from a JSON value. Null, empty strings, floats and
    /// containers are not keys.
    pub fn from_value(value: &Value) -> Option<RecordKey> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(RecordKey::Int(i))
                } else {
                    n.as_u64()
                        .and_then(|u| i64::try_from(u).ok())
                        .map(RecordKey::Int)
                }
            }
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else if let Ok(i) = trimmed.parse::<i64>() {
                    Some(RecordKey::Int(i))
                } else {
                    Some(RecordKey::Text(trimmed.to_string()))
                }
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Int(i) => write!(f, "{}", i),
            RecordKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        RecordKey::Int(value)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::from_value(&Value::String(value.to_string()))
            .unwrap_or_else(|| RecordKey::Text(value.to_string()))
    }
}

/// One JSON object fetched from the upstream API
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> CoreResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::MalformedInput {
                index: 0,
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Wrap a list of JSON values, reporting the index of the first non-object
    pub fn from_values(values: Vec<Value>) -> CoreResult<Vec<Self>> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                Value::Object(map) => Ok(Self(map)),
                other => Err(CoreError::MalformedInput {
                    index,
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                }),
            })
            .collect()
    }

    /// Encode a typed value as a record
    pub fn from_serialize<T: Serialize>(value: &T) -> CoreResult<Self> {
        let json = serde_json::to_value(value).map_err(|e| CoreError::Internal {
            message: e.to_string(),
        })?;
        Self::from_value(json)
    }

    /// Field lookup. Dotted paths (`customer.name`) descend into nested objects.
    /// JSON null reads as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        let value = match self.0.get(field) {
            Some(v) => Some(v),
            None if field.contains('.') => {
                let mut parts = field.split('.');
                let first = parts.next()?;
                let mut current = self.0.get(first)?;
                for part in parts {
                    current = current.as_object()?.get(part)?;
                }
                Some(current)
            }
            None => None,
        };
        value.filter(|v| !v.is_null())
    }

    /// Set a field
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Identity stored under `field`
    pub fn key(&self, field: &str) -> Option<RecordKey> {
        self.get(field).and_then(RecordKey::from_value)
    }

    /// Identity stored under `id`
    pub fn id(&self) -> Option<RecordKey> {
        self.key("id")
    }

    /// Scalar field rendered as text. Objects and arrays have no text form.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric field. Decimal strings such as `"100.00"` count as numbers.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Date field, accepting plain dates and timestamps
    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.get(field)? {
            Value::String(s) => erpdash_utils::parse_date(s),
            _ => None,
        }
    }

    /// Decode into a typed schema
    pub fn decode<T: DeserializeOwned>(&self, schema: &str) -> CoreResult<T> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|e| CoreError::Decode {
            schema: schema.to_string(),
            message: e.to_string(),
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Record::from_value(value)
    }
}

/// Decode every record, naming the index of the first one that fails
pub fn decode_all<T: DeserializeOwned>(records: &[Record], schema: &str) -> CoreResult<Vec<T>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record.decode(schema).map_err(|e| match e {
                CoreError::Decode { schema, message } => CoreError::Decode {
                    schema,
                    message: format!("record {}: {}", index, message),
                },
                other => other,
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
