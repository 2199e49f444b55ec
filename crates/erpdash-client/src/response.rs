//! Interpreting upstream response bodies

use erpdash_core::{CoreError, CoreResult, Record};
use serde_json::Value;

/// Keys checked, in order, for a human-readable error message
const MESSAGE_KEYS: [&str; 3] = ["detail", "error", "message"];

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub records: Vec<Record>,
    /// Absolute URL of the following page, if any
    pub next: Option<String>,
}

/// Read a list response: a bare array, or an envelope `{"results": [...], "next": ...}`
pub fn parse_list(body: Value) -> CoreResult<ListPage> {
    match body {
        Value::Array(items) => Ok(ListPage {
            records: Record::from_values(items)?,
            next: None,
        }),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => {
                let next = match map.remove("next") {
                    Some(Value::String(url)) if !url.trim().is_empty() => Some(url),
                    _ => None,
                };
                Ok(ListPage {
                    records: Record::from_values(items)?,
                    next,
                })
            }
            _ => Err(CoreError::Decode {
                schema: "list".to_string(),
                message: "expected an array or an object with a results array".to_string(),
            }),
        },
        _ => Err(CoreError::Decode {
            schema: "list".to_string(),
            message: "expected an array or an object with a results array".to_string(),
        }),
    }
}

/// Message shown when the body carries nothing readable
pub fn fallback_message(status: u16) -> String {
    format!("Request failed with status {}", status)
}

/// Best human-readable message in an error body
pub fn error_message(status: u16, body: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return fallback_message(status),
    };
    message_from_value(&parsed).unwrap_or_else(|| fallback_message(status))
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in MESSAGE_KEYS {
                if let Some(text) = map.get(key).and_then(first_text) {
                    return Some(text);
                }
            }
            if let Some(text) = map.get("non_field_errors").and_then(first_text) {
                return Some(text);
            }
            // field errors: {"quantity": ["Ensure this value is greater than 0."]}
            map.iter()
                .find_map(|(field, v)| first_text(v).map(|text| format!("{}: {}", field, text)))
        }
        other => first_text(other),
    }
}

/// Error for a non-success response
pub fn api_error(status: u16, body: &str) -> CoreError {
    CoreError::Api {
        status,
        message: error_message(status, body),
    }
}

/// Decode a success body; empty bodies (204, DELETE) read as null
pub fn parse_body(body: &str) -> CoreResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| CoreError::Decode {
        schema: "response".to_string(),
        message: e.to_string(),
    })
}
