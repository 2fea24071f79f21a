//! Single-request execution against the API.
//!
//! # Design
//! The executor performs exactly one network call per invocation and never
//! retries — retry policy belongs to the cursor, so single-object write
//! operations are never re-issued behind the caller's back. Non-2xx
//! responses go through [`classify`]; 2xx bodies that cannot be interpreted
//! are protocol errors.

use serde_json::Value;
use url::Url;

use crate::error::{classify, ClientError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::query::Query;

/// One batch of raw results plus continuation information, as returned by
/// one collection request.
#[derive(Debug)]
pub struct Page {
    pub results: Vec<Value>,
    pub next: Option<String>,
}

/// Issues one HTTP request per call and interprets the response.
pub struct RequestExecutor {
    transport: Box<dyn Transport>,
    root_url: String,
    headers: Vec<(String, String)>,
}

impl RequestExecutor {
    pub fn new(
        transport: Box<dyn Transport>,
        root_url: String,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            transport,
            root_url,
            headers,
        }
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Fetches one page of a collection query: a results envelope with a
    /// `next` link.
    pub fn get_page(&self, query: &Query) -> Result<Page, ClientError> {
        let url = match query.cursor() {
            // continuation links come back from the server fully formed
            Some(next_url) => next_url.to_string(),
            None => self.endpoint_url(query.path(), query.params())?,
        };

        let response = self.send(HttpMethod::Get, url, None)?;
        if !is_success(response.status) {
            return Err(classify(&response));
        }

        let body = parse_json(&response)?;
        let results = body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| ClientError::Protocol {
                status: response.status,
                body: "response has no results array".to_string(),
            })?;
        let next = body
            .get("next")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Page { results, next })
    }

    /// POSTs a JSON payload, returning the response status and the object
    /// the server echoes back (`None` for endpoints that respond with an
    /// empty body).
    pub fn post<P: serde::Serialize>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        payload: &P,
    ) -> Result<(u16, Option<Value>), ClientError> {
        let url = self.endpoint_url(path, params)?;
        let body = serde_json::to_string(payload).map_err(|e| ClientError::Protocol {
            status: 0,
            body: format!("cannot serialize request payload: {e}"),
        })?;

        let response = self.send(HttpMethod::Post, url, Some(body))?;
        if !is_success(response.status) {
            return Err(classify(&response));
        }

        if response.body.is_empty() {
            Ok((response.status, None))
        } else {
            parse_json(&response).map(|json| (response.status, Some(json)))
        }
    }

    /// DELETEs the object selected by the given parameters.
    pub fn delete(&self, path: &str, params: &[(&'static str, String)]) -> Result<(), ClientError> {
        let url = self.endpoint_url(path, params)?;
        let response = self.send(HttpMethod::Delete, url, None)?;
        if !is_success(response.status) {
            return Err(classify(&response));
        }
        Ok(())
    }

    /// Builds `{root}/{path}.json` with the given query parameters.
    fn endpoint_url(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, ClientError> {
        // no request has been issued yet, so this is not a connection error
        let mut url = Url::parse(&format!("{}/{path}.json", self.root_url))
            .map_err(|e| ClientError::Protocol {
                status: 0,
                body: format!("invalid URL: {e}"),
            })?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url.into())
    }

    fn send(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<String>,
    ) -> Result<HttpResponse, ClientError> {
        tracing::debug!(?method, %url, "API request");
        let request = HttpRequest {
            method,
            url,
            headers: self.headers.clone(),
            body,
        };
        let response = self.transport.execute(&request)?;
        tracing::debug!(status = response.status, "API response");
        Ok(response)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Parses a 2xx body as JSON, reporting failures as protocol errors.
fn parse_json(response: &HttpResponse) -> Result<Value, ClientError> {
    serde_json::from_str(&response.body).map_err(|_| ClientError::Protocol {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ParamValue;
    use crate::testing::MockTransport;
    use serde_json::json;
    use std::rc::Rc;

    fn executor(mock: &Rc<MockTransport>) -> RequestExecutor {
        RequestExecutor::new(
            Box::new(mock.clone()),
            "https://example.com/api/v2".to_string(),
            vec![("Authorization".to_string(), "Token 1234567890".to_string())],
        )
    }

    #[test]
    fn get_page_builds_url_and_parses_envelope() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(
            200,
            r#"{"next": "https://example.com/api/v2/contacts.json?cursor=abc", "results": [{"uuid": "u1"}, {"uuid": "u2"}]}"#,
        );

        let query = Query::new(
            "contacts",
            vec![("group", Some(ParamValue::from("Customers")))],
        );
        let page = executor(&mock).get_page(&query).unwrap();

        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0], json!({"uuid": "u1"}));
        assert_eq!(
            page.next.as_deref(),
            Some("https://example.com/api/v2/contacts.json?cursor=abc")
        );

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(
            requests[0].url,
            "https://example.com/api/v2/contacts.json?group=Customers"
        );
        assert!(requests[0]
            .headers
            .contains(&("Authorization".to_string(), "Token 1234567890".to_string())));
    }

    #[test]
    fn get_page_follows_a_cursor_url_verbatim() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(200, r#"{"next": null, "results": []}"#);

        let query = Query::new("contacts", vec![])
            .with_cursor("https://example.com/api/v2/contacts.json?cursor=xyz".to_string());
        let page = executor(&mock).get_page(&query).unwrap();

        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
        assert_eq!(
            mock.requests()[0].url,
            "https://example.com/api/v2/contacts.json?cursor=xyz"
        );
    }

    #[test]
    fn get_page_without_results_array_is_a_protocol_error() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(200, r#"{"count": 5}"#);

        let err = executor(&mock).get_page(&Query::new("contacts", vec![])).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: 200, .. }));
    }

    #[test]
    fn unparsable_success_body_is_a_protocol_error() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(200, "not json");

        let err = executor(&mock).get_page(&Query::new("contacts", vec![])).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: 200, .. }));
    }

    #[test]
    fn non_success_statuses_are_classified() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(403, r#"{"detail": "Invalid token"}"#);

        let err = executor(&mock).get_page(&Query::new("contacts", vec![])).unwrap_err();
        assert!(matches!(err, ClientError::Authentication));
    }

    #[test]
    fn invalid_root_url_fails_without_issuing_a_request() {
        let mock = Rc::new(MockTransport::new());
        let exec = RequestExecutor::new(
            Box::new(mock.clone()),
            "not a url".to_string(),
            Vec::new(),
        );

        let err = exec.get_page(&Query::new("contacts", vec![])).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: 0, .. }));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn connection_failures_surface_as_connection_errors() {
        let mock = Rc::new(MockTransport::new());
        mock.fail("connection refused");

        let err = executor(&mock).get_page(&Query::new("contacts", vec![])).unwrap_err();
        assert!(matches!(err, ClientError::Connection(msg) if msg == "connection refused"));
    }

    #[test]
    fn post_sends_payload_and_returns_echoed_object() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(201, r#"{"uuid": "u1", "name": "Reporters"}"#);

        let (status, created) = executor(&mock)
            .post("groups", &[], &json!({"name": "Reporters"}))
            .unwrap();

        assert_eq!(status, 201);
        assert_eq!(created, Some(json!({"uuid": "u1", "name": "Reporters"})));
        let requests = mock.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, "https://example.com/api/v2/groups.json");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"name":"Reporters"}"#));
    }

    #[test]
    fn post_with_selector_param_targets_one_object() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(200, r#"{"uuid": "u1", "name": "Renamed"}"#);

        executor(&mock)
            .post(
                "groups",
                &[("uuid", "u1".to_string())],
                &json!({"name": "Renamed"}),
            )
            .unwrap();

        assert_eq!(
            mock.requests()[0].url,
            "https://example.com/api/v2/groups.json?uuid=u1"
        );
    }

    #[test]
    fn post_with_empty_response_body_returns_none() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(204, "");

        let (status, result) = executor(&mock).post("contact_actions", &[], &json!({})).unwrap();
        assert_eq!(status, 204);
        assert_eq!(result, None);
    }

    #[test]
    fn delete_succeeds_on_204_and_classifies_404() {
        let mock = Rc::new(MockTransport::new());
        mock.respond(204, "");
        mock.respond(404, "");

        let exec = executor(&mock);
        exec.delete("contacts", &[("uuid", "u1".to_string())]).unwrap();
        let err = exec.delete("contacts", &[("uuid", "u1".to_string())]).unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
        assert_eq!(
            mock.requests()[0].url,
            "https://example.com/api/v2/contacts.json?uuid=u1"
        );
        assert_eq!(mock.requests()[0].method, HttpMethod::Delete);
    }
}
