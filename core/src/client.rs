//! Client facade: one query entry point per resource plus direct write
//! operations.
//!
//! # Design
//! `RapidProClient` binds the cursor engine to the concrete v2 endpoints.
//! Query methods return a [`Cursor`] and perform no I/O until it is driven;
//! create/update/delete methods issue exactly one request through the
//! executor and are never retried automatically.

use serde_json::{json, Value};

use crate::cursor::Cursor;
use crate::error::ClientError;
use crate::executor::RequestExecutor;
use crate::http::{Transport, UreqTransport};
use crate::resources::{
    BroadcastFilter, BroadcastPayload, ContactFilter, ContactPayload, FieldFilter, FlowFilter,
    GroupFilter, LabelFilter, MessageFilter, RunFilter, BROADCAST, CONTACT, FIELD, FLOW, GROUP,
    LABEL, MESSAGE, RUN,
};
use crate::schema::{Schema, TypedObject};

const CLIENT_NAME: &str = "rapidpro-core";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client for the RapidPro API v2.
pub struct RapidProClient {
    executor: RequestExecutor,
}

impl RapidProClient {
    /// Creates a client for the given server and organization API token,
    /// using the default HTTP transport.
    ///
    /// A bare hostname like `rapidpro.io` expands to
    /// `https://rapidpro.io/api/v2`; an explicit `http(s)://...` root is
    /// used as-is (minus any trailing slash).
    pub fn new(host: &str, token: &str) -> Self {
        Self::with_transport(host, token, None, Box::new(UreqTransport::new()))
    }

    /// Like [`RapidProClient::new`] with a string prepended to the
    /// User-Agent header.
    pub fn with_user_agent(host: &str, token: &str, user_agent: &str) -> Self {
        Self::with_transport(host, token, Some(user_agent), Box::new(UreqTransport::new()))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(
        host: &str,
        token: &str,
        user_agent: Option<&str>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let executor = RequestExecutor::new(transport, root_url(host), headers(token, user_agent));
        Self { executor }
    }

    pub fn root_url(&self) -> &str {
        self.executor.root_url()
    }

    // =======================================================================
    // Query operations
    // =======================================================================

    pub fn get_contacts(&self, filter: ContactFilter) -> Cursor<'_> {
        self.query(&CONTACT, filter.query())
    }

    pub fn get_groups(&self, filter: GroupFilter) -> Cursor<'_> {
        self.query(&GROUP, filter.query())
    }

    pub fn get_fields(&self, filter: FieldFilter) -> Cursor<'_> {
        self.query(&FIELD, filter.query())
    }

    pub fn get_messages(&self, filter: MessageFilter) -> Cursor<'_> {
        self.query(&MESSAGE, filter.query())
    }

    pub fn get_broadcasts(&self, filter: BroadcastFilter) -> Cursor<'_> {
        self.query(&BROADCAST, filter.query())
    }

    pub fn get_flows(&self, filter: FlowFilter) -> Cursor<'_> {
        self.query(&FLOW, filter.query())
    }

    pub fn get_runs(&self, filter: RunFilter) -> Cursor<'_> {
        self.query(&RUN, filter.query())
    }

    pub fn get_labels(&self, filter: LabelFilter) -> Cursor<'_> {
        self.query(&LABEL, filter.query())
    }

    // =======================================================================
    // Create object operations
    // =======================================================================

    pub fn create_contact(&self, payload: &ContactPayload) -> Result<TypedObject, ClientError> {
        let (status, raw) = self.executor.post("contacts", &[], payload)?;
        materialize_response(&CONTACT, status, raw)
    }

    pub fn create_group(&self, name: &str) -> Result<TypedObject, ClientError> {
        let (status, raw) = self.executor.post("groups", &[], &json!({ "name": name }))?;
        materialize_response(&GROUP, status, raw)
    }

    pub fn create_label(&self, name: &str) -> Result<TypedObject, ClientError> {
        let (status, raw) = self.executor.post("labels", &[], &json!({ "name": name }))?;
        materialize_response(&LABEL, status, raw)
    }

    /// Creates and sends a broadcast to the given URNs, contacts or groups.
    pub fn create_broadcast(&self, payload: &BroadcastPayload) -> Result<TypedObject, ClientError> {
        let (status, raw) = self.executor.post("broadcasts", &[], payload)?;
        materialize_response(&BROADCAST, status, raw)
    }

    // =======================================================================
    // Update object operations
    // =======================================================================

    pub fn update_contact(
        &self,
        uuid: &str,
        payload: &ContactPayload,
    ) -> Result<TypedObject, ClientError> {
        let (status, raw) = self
            .executor
            .post("contacts", &selector(uuid), payload)?;
        materialize_response(&CONTACT, status, raw)
    }

    pub fn update_group(&self, uuid: &str, name: &str) -> Result<TypedObject, ClientError> {
        let (status, raw) = self
            .executor
            .post("groups", &selector(uuid), &json!({ "name": name }))?;
        materialize_response(&GROUP, status, raw)
    }

    // =======================================================================
    // Delete object operations
    // =======================================================================

    pub fn delete_contact(&self, uuid: &str) -> Result<(), ClientError> {
        self.executor.delete("contacts", &selector(uuid))
    }

    pub fn delete_group(&self, uuid: &str) -> Result<(), ClientError> {
        self.executor.delete("groups", &selector(uuid))
    }

    fn query(&self, schema: &'static Schema, query: crate::query::Query) -> Cursor<'_> {
        Cursor::new(&self.executor, schema, query)
    }
}

fn selector(uuid: &str) -> [(&'static str, String); 1] {
    [("uuid", uuid.to_string())]
}

fn materialize_response(
    schema: &'static Schema,
    status: u16,
    raw: Option<Value>,
) -> Result<TypedObject, ClientError> {
    let raw = raw.ok_or_else(|| ClientError::Protocol {
        status,
        body: "expected an object in the response".to_string(),
    })?;
    Ok(schema.materialize(&raw)?)
}

fn root_url(host: &str) -> String {
    if host.starts_with("http") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{host}/api/v2")
    }
}

fn headers(token: &str, user_agent: Option<&str>) -> Vec<(String, String)> {
    let user_agent_header = match user_agent {
        Some(agent) => format!("{agent} {CLIENT_NAME}/{CLIENT_VERSION}"),
        None => format!("{CLIENT_NAME}/{CLIENT_VERSION}"),
    };
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), format!("Token {token}")),
        ("User-Agent".to_string(), user_agent_header),
    ]
}
