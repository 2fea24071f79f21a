//! Resource schemas, filter parameters and write payloads.
//!
//! Schemas are built once on first use and immutable for the process
//! lifetime. Each filter struct mirrors the query parameters its endpoint
//! accepts; unset fields are simply not sent.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fields::Codec;
use crate::query::{ParamValue, Query};
use crate::schema::Schema;

fn object_ref() -> Schema {
    Schema::new("object_ref")
        .field("uuid", Codec::Identifier)
        .optional("name", Codec::Text)
}

fn attachment_ref() -> Schema {
    Schema::new("attachment")
        .field("content_type", Codec::Text)
        .field("url", Codec::Text)
}

const CONTACT_STATUSES: &[&str] = &["active", "blocked", "stopped", "archived"];
const GROUP_STATUSES: &[&str] = &["ready", "evaluating"];
const FIELD_TYPES: &[&str] = &["text", "numeric", "datetime", "state", "district", "ward"];
const MESSAGE_DIRECTIONS: &[&str] = &["in", "out"];
const MESSAGE_VISIBILITIES: &[&str] = &["visible", "archived", "deleted"];
const RUN_EXIT_TYPES: &[&str] = &["completed", "interrupted", "expired", "failed"];

pub static CONTACT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("contact")
        .field("uuid", Codec::Identifier)
        .optional("name", Codec::Text)
        .optional("status", Codec::Symbol(CONTACT_STATUSES))
        .optional("language", Codec::Text)
        .field("urns", Codec::List(Box::new(Codec::Identifier)))
        .field("groups", Codec::List(Box::new(Codec::Object(Box::new(object_ref())))))
        .field("created_on", Codec::Timestamp)
        .field("modified_on", Codec::Timestamp)
        .optional("last_seen_on", Codec::Timestamp)
});

pub static GROUP: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("group")
        .field("uuid", Codec::Identifier)
        .field("name", Codec::Text)
        .optional("query", Codec::Text)
        .optional("status", Codec::Symbol(GROUP_STATUSES))
        .optional("system", Codec::Boolean)
        .optional("count", Codec::Integer)
});

pub static FIELD: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("field")
        .field("key", Codec::Identifier)
        .field("name", Codec::Text)
        .optional("value_type", Codec::Symbol(FIELD_TYPES))
});

pub static MESSAGE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("message")
        .field("id", Codec::Integer)
        .optional("broadcast", Codec::Integer)
        .field("contact", Codec::Object(Box::new(object_ref())))
        .optional("urn", Codec::Identifier)
        .optional("channel", Codec::Object(Box::new(object_ref())))
        .field("direction", Codec::Symbol(MESSAGE_DIRECTIONS))
        .optional("status", Codec::Text)
        .optional("visibility", Codec::Symbol(MESSAGE_VISIBILITIES))
        .field("text", Codec::Text)
        .optional("labels", Codec::List(Box::new(Codec::Object(Box::new(object_ref())))))
        .optional("attachments", Codec::List(Box::new(Codec::Object(Box::new(attachment_ref())))))
        .field("created_on", Codec::Timestamp)
        .optional("sent_on", Codec::Timestamp)
        .optional("modified_on", Codec::Timestamp)
});

pub static BROADCAST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("broadcast")
        .field("id", Codec::Integer)
        .optional("status", Codec::Text)
        .optional("urns", Codec::List(Box::new(Codec::Identifier)))
        .field("contacts", Codec::List(Box::new(Codec::Object(Box::new(object_ref())))))
        .field("groups", Codec::List(Box::new(Codec::Object(Box::new(object_ref())))))
        .optional("text", Codec::Text)
        .field("created_on", Codec::Timestamp)
});

pub static FLOW: LazyLock<Schema> = LazyLock::new(|| {
    let run_stats = Schema::new("flow_runs")
        .optional("active", Codec::Integer)
        .optional("waiting", Codec::Integer)
        .optional("completed", Codec::Integer)
        .optional("interrupted", Codec::Integer)
        .optional("expired", Codec::Integer)
        .optional("failed", Codec::Integer);
    let flow_result = Schema::new("flow_result")
        .field("key", Codec::Identifier)
        .optional("name", Codec::Text);

    Schema::new("flow")
        .field("uuid", Codec::Identifier)
        .field("name", Codec::Text)
        .optional("type", Codec::Text)
        .field("archived", Codec::Boolean)
        .field("labels", Codec::List(Box::new(Codec::Object(Box::new(object_ref())))))
        .optional("expires", Codec::Integer)
        .field("created_on", Codec::Timestamp)
        .optional("runs", Codec::Object(Box::new(run_stats)))
        .optional("results", Codec::List(Box::new(Codec::Object(Box::new(flow_result)))))
});

pub static RUN: LazyLock<Schema> = LazyLock::new(|| {
    let start_ref = Schema::new("start_ref").field("uuid", Codec::Identifier);
    let step = Schema::new("step")
        .field("node", Codec::Identifier)
        .field("time", Codec::Timestamp);

    Schema::new("run")
        .field("uuid", Codec::Identifier)
        .field("flow", Codec::Object(Box::new(object_ref())))
        .field("contact", Codec::Object(Box::new(object_ref())))
        .optional("start", Codec::Object(Box::new(start_ref)))
        .field("responded", Codec::Boolean)
        .optional("path", Codec::List(Box::new(Codec::Object(Box::new(step)))))
        .field("created_on", Codec::Timestamp)
        .field("modified_on", Codec::Timestamp)
        .optional("exited_on", Codec::Timestamp)
        .optional("exit_type", Codec::Symbol(RUN_EXIT_TYPES))
});

pub static LABEL: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("label")
        .field("uuid", Codec::Identifier)
        .field("name", Codec::Text)
        .optional("count", Codec::Integer)
});

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub uuid: Option<String>,
    pub urn: Option<String>,
    pub group: Option<String>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub reverse: Option<bool>,
}

impl ContactFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "contacts",
            vec![
                ("uuid", self.uuid.map(ParamValue::from)),
                ("urn", self.urn.map(ParamValue::from)),
                ("group", self.group.map(ParamValue::from)),
                ("before", self.before.map(ParamValue::from)),
                ("after", self.after.map(ParamValue::from)),
                ("reverse", self.reverse.map(ParamValue::from)),
            ],
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl GroupFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "groups",
            vec![
                ("uuid", self.uuid.map(ParamValue::from)),
                ("name", self.name.map(ParamValue::from)),
            ],
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    pub key: Option<String>,
}

impl FieldFilter {
    pub(crate) fn query(self) -> Query {
        Query::new("fields", vec![("key", self.key.map(ParamValue::from))])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub id: Option<i64>,
    pub contact: Option<String>,
    pub folder: Option<String>,
    pub label: Option<String>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
}

impl MessageFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "messages",
            vec![
                ("id", self.id.map(ParamValue::from)),
                ("contact", self.contact.map(ParamValue::from)),
                ("folder", self.folder.map(ParamValue::from)),
                ("label", self.label.map(ParamValue::from)),
                ("before", self.before.map(ParamValue::from)),
                ("after", self.after.map(ParamValue::from)),
            ],
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct BroadcastFilter {
    pub id: Option<i64>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
}

impl BroadcastFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "broadcasts",
            vec![
                ("id", self.id.map(ParamValue::from)),
                ("before", self.before.map(ParamValue::from)),
                ("after", self.after.map(ParamValue::from)),
            ],
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowFilter {
    pub uuid: Option<String>,
}

impl FlowFilter {
    pub(crate) fn query(self) -> Query {
        Query::new("flows", vec![("uuid", self.uuid.map(ParamValue::from))])
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub uuid: Option<String>,
    pub flow: Option<String>,
    pub contact: Option<String>,
    pub responded: Option<bool>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
}

impl RunFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "runs",
            vec![
                ("uuid", self.uuid.map(ParamValue::from)),
                ("flow", self.flow.map(ParamValue::from)),
                ("contact", self.contact.map(ParamValue::from)),
                ("responded", self.responded.map(ParamValue::from)),
                ("before", self.before.map(ParamValue::from)),
                ("after", self.after.map(ParamValue::from)),
            ],
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelFilter {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl LabelFilter {
    pub(crate) fn query(self) -> Query {
        Query::new(
            "labels",
            vec![
                ("uuid", self.uuid.map(ParamValue::from)),
                ("name", self.name.map(ParamValue::from)),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

/// Body for creating or updating a contact. Omitted fields are left
/// unchanged on the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

/// Body for creating and sending a broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}
