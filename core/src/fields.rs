//! Field codecs: bidirectional conversion between raw JSON values and typed
//! field values.
//!
//! # Design
//! A [`Codec`] describes how one field converts between its wire form and a
//! [`FieldValue`]. Decoding is strict: enum fields reject unknown members and
//! integer fields reject fractional numbers, so schema drift between client
//! and server surfaces as a [`DecodeError`] naming the offending field and
//! raw value instead of silently producing bad data. Encoding always emits
//! the canonical wire form (timestamps as UTC RFC 3339 with microseconds).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::schema::{Schema, TypedObject};

/// A raw value (or a whole item) could not be converted to its typed form.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot decode field '{field}': {reason} (raw value: {raw})")]
pub struct DecodeError {
    /// Path of the offending field, e.g. `groups[1].uuid`.
    pub field: String,
    pub reason: String,
    pub raw: Value,
}

impl DecodeError {
    pub(crate) fn new(field: impl Into<String>, reason: impl Into<String>, raw: &Value) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            raw: raw.clone(),
        }
    }

    /// Prepends a parent segment to the field path, keeping errors from
    /// nested objects and lists attributable to one field of the outer item.
    pub(crate) fn nested_under(mut self, parent: &str) -> Self {
        self.field = format!("{parent}.{}", self.field);
        self
    }
}

/// Wire-to-typed conversion rule for one field.
#[derive(Debug, Clone)]
pub enum Codec {
    /// Non-empty string identifier (UUIDs, URNs, keys). No structural check
    /// beyond non-emptiness.
    Identifier,
    /// Free-form string.
    Text,
    /// Integer without fractional part.
    Integer,
    Boolean,
    /// RFC 3339 timestamp with timezone.
    Timestamp,
    /// String restricted to a known member set.
    Symbol(&'static [&'static str]),
    /// Nested object materialized with another schema.
    Object(Box<Schema>),
    /// Order-preserving sequence of another codec. An empty list is valid
    /// and distinct from an absent field.
    List(Box<Codec>),
}

impl Codec {
    /// Decodes one raw value. Fails with the field name attached.
    pub fn decode(&self, field: &str, raw: &Value) -> Result<FieldValue, DecodeError> {
        match self {
            Codec::Identifier => match raw.as_str() {
                Some(s) if !s.is_empty() => Ok(FieldValue::Identifier(s.to_string())),
                Some(_) => Err(DecodeError::new(field, "identifier is empty", raw)),
                None => Err(DecodeError::new(field, "value is not a string", raw)),
            },
            Codec::Text => match raw.as_str() {
                Some(s) => Ok(FieldValue::Text(s.to_string())),
                None => Err(DecodeError::new(field, "value is not a string", raw)),
            },
            Codec::Integer => match raw.as_i64() {
                Some(n) => Ok(FieldValue::Integer(n)),
                None => Err(DecodeError::new(field, "value is not an integer", raw)),
            },
            Codec::Boolean => match raw.as_bool() {
                Some(b) => Ok(FieldValue::Boolean(b)),
                None => Err(DecodeError::new(field, "value is not a boolean", raw)),
            },
            Codec::Timestamp => {
                let s = raw
                    .as_str()
                    .ok_or_else(|| DecodeError::new(field, "value is not a string", raw))?;
                let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                    DecodeError::new(field, format!("invalid timestamp: {e}"), raw)
                })?;
                Ok(FieldValue::Timestamp(parsed.with_timezone(&Utc)))
            }
            Codec::Symbol(members) => {
                let s = raw
                    .as_str()
                    .ok_or_else(|| DecodeError::new(field, "value is not a string", raw))?;
                if members.contains(&s) {
                    Ok(FieldValue::Symbol(s.to_string()))
                } else {
                    Err(DecodeError::new(
                        field,
                        format!("not one of {}", members.join(", ")),
                        raw,
                    ))
                }
            }
            Codec::Object(schema) => {
                let object = schema
                    .materialize(raw)
                    .map_err(|e| e.nested_under(field))?;
                Ok(FieldValue::Object(object))
            }
            Codec::List(item) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| DecodeError::new(field, "value is not a list", raw))?;
                let mut decoded = Vec::with_capacity(items.len());
                for (i, raw_item) in items.iter().enumerate() {
                    decoded.push(item.decode(&format!("{field}[{i}]"), raw_item)?);
                }
                Ok(FieldValue::List(decoded))
            }
        }
    }
}

/// A materialized, typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Identifier(String),
    Text(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Symbol(String),
    Object(TypedObject),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Encodes back to the raw wire form.
    pub fn encode(&self) -> Value {
        match self {
            FieldValue::Identifier(s) | FieldValue::Text(s) | FieldValue::Symbol(s) => {
                Value::String(s.clone())
            }
            FieldValue::Integer(n) => Value::from(*n),
            FieldValue::Boolean(b) => Value::from(*b),
            FieldValue::Timestamp(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            FieldValue::Object(object) => object.serialize(),
            FieldValue::List(items) => Value::Array(items.iter().map(|v| v.encode()).collect()),
        }
    }

    /// The string content of identifier, text and symbol values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Identifier(s) | FieldValue::Text(s) | FieldValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            FieldValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}
