//! Resource schemas and materialized objects.
//!
//! # Design
//! A [`Schema`] is an ordered list of field descriptors built once at
//! startup and immutable afterwards. [`Schema::materialize`] applies it to
//! one raw JSON object, failing fast on the first required field that is
//! missing or undecodable so every error is attributable to exactly one
//! field. Optional fields that are missing or `null` become an explicit
//! absent value, never a decode failure.

use serde_json::{Map, Value};

use crate::fields::{Codec, DecodeError, FieldValue};

/// Descriptor for one field of a resource.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub codec: Codec,
    pub required: bool,
}

/// Ordered field schema for one resource type.
#[derive(Debug, Clone)]
pub struct Schema {
    resource: &'static str,
    fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            fields: Vec::new(),
        }
    }

    /// Appends a required field.
    pub fn field(mut self, name: &'static str, codec: Codec) -> Self {
        self.fields.push(FieldSchema {
            name,
            codec,
            required: true,
        });
        self
    }

    /// Appends an optional field.
    pub fn optional(mut self, name: &'static str, codec: Codec) -> Self {
        self.fields.push(FieldSchema {
            name,
            codec,
            required: false,
        });
        self
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Materializes one raw JSON object into a [`TypedObject`].
    ///
    /// Fields are processed in schema order. A required field that is
    /// missing, `null`, or undecodable aborts with a [`DecodeError`] naming
    /// that field; remaining fields are not examined.
    pub fn materialize(&self, raw: &Value) -> Result<TypedObject, DecodeError> {
        let item = raw.as_object().ok_or_else(|| {
            DecodeError::new(
                self.resource,
                format!("{} item is not a JSON object", self.resource),
                raw,
            )
        })?;

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw_value = item.get(field.name);
            let value = match raw_value {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(DecodeError::new(
                            field.name,
                            format!("{} item is missing required field", self.resource),
                            raw_value.unwrap_or(&Value::Null),
                        ));
                    }
                    None
                }
                Some(raw_value) => Some(field.codec.decode(field.name, raw_value)?),
            };
            values.push((field.name, value));
        }

        Ok(TypedObject {
            resource: self.resource,
            values,
        })
    }

    /// Materializes a list of raw items, failing on the first bad item.
    pub fn materialize_list(&self, items: &[Value]) -> Result<Vec<TypedObject>, DecodeError> {
        items.iter().map(|item| self.materialize(item)).collect()
    }
}

/// An immutable, schema-validated representation of one resource instance.
///
/// Values are stored in schema order. Absent optional fields are kept as
/// explicit `None` entries, distinguishable from fields the schema does not
/// know about (for which [`TypedObject::get`] also returns `None`, but
/// [`TypedObject::is_absent`] returns `false`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypedObject {
    resource: &'static str,
    values: Vec<(&'static str, Option<FieldValue>)>,
}

impl TypedObject {
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// The typed value of a field, or `None` if absent or unknown.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Whether the field is known to the schema but was absent (or `null`)
    /// in the payload.
    pub fn is_absent(&self, name: &str) -> bool {
        self.values
            .iter()
            .any(|(n, v)| *n == name && v.is_none())
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_integer())
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_boolean())
    }

    pub fn timestamp(&self, name: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get(name).and_then(|v| v.as_timestamp())
    }

    pub fn object(&self, name: &str) -> Option<&TypedObject> {
        self.get(name).and_then(|v| v.as_object())
    }

    pub fn list(&self, name: &str) -> Option<&[FieldValue]> {
        self.get(name).and_then(|v| v.as_list())
    }

    /// Encodes present fields back to a raw JSON object in schema order.
    /// Absent fields are omitted.
    pub fn serialize(&self) -> Value {
        let mut item = Map::new();
        for (name, value) in &self.values {
            if let Some(value) = value {
                item.insert((*name).to_string(), value.encode());
            }
        }
        Value::Object(item)
    }
}
