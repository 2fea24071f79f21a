//! Scripted in-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

/// A [`Transport`] that replays queued responses and records every request.
///
/// Responses are consumed in FIFO order; a request beyond the script panics
/// the test. When the queue holds exactly one response it is replayed
/// indefinitely if `repeat_last` is set, which models a server that keeps
/// returning the same status.
pub(crate) struct MockTransport {
    script: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
    repeat_last: RefCell<bool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: RefCell::new(VecDeque::new()),
            requests: RefCell::new(Vec::new()),
            repeat_last: RefCell::new(false),
        }
    }

    /// Queues a response with the given status and body.
    pub fn respond(&self, status: u16, body: &str) {
        self.respond_with_headers(status, body, Vec::new());
    }

    pub fn respond_with_headers(&self, status: u16, body: &str, headers: Vec<(String, String)>) {
        self.script.borrow_mut().push_back(Ok(HttpResponse {
            status,
            headers,
            body: body.to_string(),
        }));
    }

    /// Queues a connection failure.
    pub fn fail(&self, message: &str) {
        self.script
            .borrow_mut()
            .push_back(Err(TransportError(message.to_string())));
    }

    /// Replays the final queued response for every request past the end of
    /// the script instead of panicking.
    pub fn repeat_last(&self) {
        *self.repeat_last.borrow_mut() = true;
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for Rc<MockTransport> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let mut script = self.script.borrow_mut();
        if script.len() == 1 && *self.repeat_last.borrow() {
            return script.front().expect("script is not empty").clone();
        }
        script
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request_method(request), request.url))
    }
}

fn request_method(request: &HttpRequest) -> &'static str {
    match request.method {
        crate::http::HttpMethod::Get => "GET",
        crate::http::HttpMethod::Post => "POST",
        crate::http::HttpMethod::Delete => "DELETE",
    }
}
