//! Immutable query descriptions.
//!
//! A [`Query`] captures one filtered request against one resource: the
//! resource path, the serialized filter parameters, and the continuation
//! cursor, if any. Advancing to the next page produces a new `Query` via
//! [`Query::with_cursor`]; queries are never mutated in place.

use chrono::{DateTime, SecondsFormat, Utc};

/// A filter parameter value before wire serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Serializes to the query-string form the API expects: booleans as
    /// `1`/`0`, timestamps as UTC RFC 3339, lists comma-joined.
    pub fn to_wire(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            ParamValue::Timestamp(dt) => dt.to_rfc3339_opts(SecondsFormat::Micros, true),
            ParamValue::List(items) => items
                .iter()
                .map(ParamValue::to_wire)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(dt: DateTime<Utc>) -> Self {
        ParamValue::Timestamp(dt)
    }
}

/// An immutable description of a filtered, paginated request against one
/// resource.
#[derive(Debug, Clone)]
pub struct Query {
    path: &'static str,
    params: Vec<(&'static str, String)>,
    cursor: Option<String>,
}

impl Query {
    /// Builds a query from unserialized filter parameters, dropping unset
    /// ones and serializing the rest in order.
    pub fn new(path: &'static str, params: Vec<(&'static str, Option<ParamValue>)>) -> Self {
        let params = params
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v.to_wire())))
            .collect();
        Self {
            path,
            params,
            cursor: None,
        }
    }

    /// The resource's relative path, e.g. `contacts`.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Serialized filter parameters in insertion order.
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// The continuation URL for the next page, if this query resumes one.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// A new query continuing from the given next-page URL. Filter
    /// parameters are already baked into that URL by the server, so they
    /// are not re-sent.
    pub fn with_cursor(&self, next_url: String) -> Self {
        Self {
            path: self.path,
            params: Vec::new(),
            cursor: Some(next_url),
        }
    }
}
