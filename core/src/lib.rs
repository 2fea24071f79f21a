//! Typed client for the RapidPro REST API.
//!
//! # Overview
//! Query methods on [`RapidProClient`] build an immutable [`Query`] and
//! return a [`Cursor`] over its pages of results. Driving the cursor issues
//! one HTTP request per page through a pluggable [`Transport`], classifies
//! failures into the closed [`ClientError`] set, and materializes each raw
//! item against a process-wide resource [`Schema`] into a [`TypedObject`].
//!
//! # Design
//! - Schemas are built once and never mutated; queries, pages and typed
//!   objects are per-call values, with cursor advancement producing a new
//!   query rather than mutating the old one.
//! - Rate-limit retry is an opt-in policy on the cursor and applies only to
//!   paged reads; create/update/delete calls issue exactly one request and
//!   surface whatever the server returns.
//! - Result ordering is whatever the server returns. Records created while
//!   paging can shift later pages; callers needing a fixed snapshot should
//!   bound the query with a `before` timestamp.
//!
//! ```no_run
//! use rapidpro_core::{ContactFilter, RapidProClient};
//!
//! let client = RapidProClient::new("rapidpro.io", "your-api-token");
//! let contacts = client
//!     .get_contacts(ContactFilter { group: Some("Customers".into()), ..Default::default() })
//!     .with_rate_limit_retry(true)
//!     .all()?;
//! for contact in &contacts {
//!     println!("{:?}", contact.string("name"));
//! }
//! # Ok::<(), rapidpro_core::ClientError>(())
//! ```

pub mod client;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod fields;
pub mod http;
pub mod query;
pub mod resources;
pub mod schema;

#[cfg(test)]
mod testing;

pub use client::RapidProClient;
pub use cursor::{Cursor, Pages, MAX_RATE_LIMIT_RETRIES};
pub use error::{classify, ClientError, ValidationErrors, DEFAULT_RETRY_AFTER_SECS};
pub use executor::{Page, RequestExecutor};
pub use fields::{Codec, DecodeError, FieldValue};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use query::{ParamValue, Query};
pub use resources::{
    BroadcastFilter, BroadcastPayload, ContactFilter, ContactPayload, FieldFilter, FlowFilter,
    GroupFilter, LabelFilter, MessageFilter, RunFilter,
};
pub use schema::{FieldSchema, Schema, TypedObject};
