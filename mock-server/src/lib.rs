//! In-memory RapidPro API stand-in for integration tests.
//!
//! Serves a subset of the v2 wire contract: collection endpoints return a
//! results envelope with a `next` link and cursor query parameter, writes
//! are POSTs (with a `uuid` selector for updates), validation failures are
//! per-field message maps, and a test-only `/_config/rate_limits` endpoint
//! arms a number of upcoming 429 responses carrying a `Retry-After` header.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Results per page; small so tests exercise pagination cheaply.
const PAGE_SIZE: usize = 2;

const CREATED_ON: &str = "2024-01-01T00:00:00.000000Z";

#[derive(Clone, Debug, Serialize)]
pub struct GroupRef {
    pub uuid: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Contact {
    pub uuid: String,
    pub name: Option<String>,
    pub status: String,
    pub language: Option<String>,
    pub urns: Vec<String>,
    pub groups: Vec<GroupRef>,
    pub created_on: String,
    pub modified_on: String,
    pub last_seen_on: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Group {
    pub uuid: String,
    pub name: String,
    pub query: Option<String>,
    pub status: String,
    pub system: bool,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub urns: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupPayload {
    #[serde(default)]
    pub name: String,
}

#[derive(Default)]
pub struct AppState {
    contacts: Vec<Contact>,
    groups: Vec<Group>,
    /// Number of upcoming collection GETs to answer with 429.
    rate_limit_next: u32,
}

pub type Db = Arc<RwLock<AppState>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(AppState::default()));
    Router::new()
        .route(
            "/api/v2/contacts.json",
            get(list_contacts)
                .post(upsert_contact)
                .delete(delete_contact),
        )
        .route("/api/v2/groups.json", get(list_groups).post(upsert_group))
        .route("/_config/rate_limits", post(arm_rate_limits))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

#[derive(Debug, Deserialize)]
struct ListParams {
    cursor: Option<usize>,
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Selector {
    uuid: Option<String>,
}

#[derive(Serialize)]
struct Envelope<T> {
    next: Option<String>,
    results: Vec<T>,
}

async fn list_contacts(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let mut state = db.write().await;
    if let Some(response) = take_rate_limit(&mut state) {
        return response;
    }

    let matching: Vec<Contact> = state
        .contacts
        .iter()
        .filter(|c| match &params.group {
            Some(group) => c.groups.iter().any(|g| &g.name == group || &g.uuid == group),
            None => true,
        })
        .cloned()
        .collect();

    let filter = params
        .group
        .as_ref()
        .map(|g| format!("&group={g}"))
        .unwrap_or_default();
    paginated(&headers, "contacts", &filter, &matching, params.cursor)
}

async fn upsert_contact(
    State(db): State<Db>,
    Query(selector): Query<Selector>,
    Json(payload): Json<ContactPayload>,
) -> Response {
    let mut state = db.write().await;

    let groups: Vec<GroupRef> = match resolve_groups(&state, &payload.groups) {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    match selector.uuid {
        Some(uuid) => {
            let Some(contact) = state.contacts.iter_mut().find(|c| c.uuid == uuid) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            if payload.name.is_some() {
                contact.name = payload.name;
            }
            if payload.language.is_some() {
                contact.language = payload.language;
            }
            if !payload.urns.is_empty() {
                contact.urns = payload.urns;
            }
            if !payload.groups.is_empty() {
                contact.groups = groups;
            }
            Json(contact.clone()).into_response()
        }
        None => {
            let contact = Contact {
                uuid: Uuid::new_v4().to_string(),
                name: payload.name,
                status: "active".to_string(),
                language: payload.language,
                urns: payload.urns,
                groups,
                created_on: CREATED_ON.to_string(),
                modified_on: CREATED_ON.to_string(),
                last_seen_on: None,
            };
            state.contacts.push(contact.clone());
            (StatusCode::CREATED, Json(contact)).into_response()
        }
    }
}

async fn delete_contact(State(db): State<Db>, Query(selector): Query<Selector>) -> Response {
    let Some(uuid) = selector.uuid else {
        return validation_error("uuid", "This field is required.");
    };
    let mut state = db.write().await;
    let before = state.contacts.len();
    state.contacts.retain(|c| c.uuid != uuid);
    if state.contacts.len() < before {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_groups(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let mut state = db.write().await;
    if let Some(response) = take_rate_limit(&mut state) {
        return response;
    }
    let groups = state.groups.clone();
    paginated(&headers, "groups", "", &groups, params.cursor)
}

async fn upsert_group(
    State(db): State<Db>,
    Query(selector): Query<Selector>,
    Json(payload): Json<GroupPayload>,
) -> Response {
    if payload.name.is_empty() {
        return validation_error("name", "This field is required.");
    }

    let mut state = db.write().await;
    match selector.uuid {
        Some(uuid) => {
            let Some(group) = state.groups.iter_mut().find(|g| g.uuid == uuid) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            group.name = payload.name;
            Json(group.clone()).into_response()
        }
        None => {
            let group = Group {
                uuid: Uuid::new_v4().to_string(),
                name: payload.name,
                query: None,
                status: "ready".to_string(),
                system: false,
                count: 0,
            };
            state.groups.push(group.clone());
            (StatusCode::CREATED, Json(group)).into_response()
        }
    }
}

async fn arm_rate_limits(State(db): State<Db>, Json(count): Json<u32>) -> StatusCode {
    db.write().await.rate_limit_next = count;
    StatusCode::NO_CONTENT
}

/// Consumes one armed rate limit, if any.
fn take_rate_limit(state: &mut AppState) -> Option<Response> {
    if state.rate_limit_next == 0 {
        return None;
    }
    state.rate_limit_next -= 1;
    Some((StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "1")], "").into_response())
}

fn paginated<T: Serialize + Clone>(
    headers: &HeaderMap,
    path: &str,
    filter: &str,
    items: &[T],
    cursor: Option<usize>,
) -> Response {
    let offset = cursor.unwrap_or(0);
    let page: Vec<T> = items.iter().skip(offset).take(PAGE_SIZE).cloned().collect();

    let next = if offset + PAGE_SIZE < items.len() {
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("127.0.0.1");
        Some(format!(
            "http://{host}/api/v2/{path}.json?cursor={}{filter}",
            offset + PAGE_SIZE
        ))
    } else {
        None
    };

    Json(Envelope {
        next,
        results: page,
    })
    .into_response()
}

fn resolve_groups(state: &AppState, wanted: &[String]) -> Result<Vec<GroupRef>, Response> {
    let mut refs = Vec::with_capacity(wanted.len());
    for name_or_uuid in wanted {
        match state
            .groups
            .iter()
            .find(|g| &g.uuid == name_or_uuid || &g.name == name_or_uuid)
        {
            Some(group) => refs.push(GroupRef {
                uuid: group.uuid.clone(),
                name: group.name.clone(),
            }),
            None => {
                return Err(validation_error(
                    "groups",
                    &format!("No such object: {name_or_uuid}"),
                ))
            }
        }
    }
    Ok(refs)
}

fn validation_error(field: &str, message: &str) -> Response {
    let body = serde_json::json!({ field: [message] });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
