//! Lazy, page-by-page iteration over collection queries.
//!
//! # Design
//! A [`Cursor`] owns one in-flight iteration: the current [`Query`]
//! (advanced functionally as continuation links come back) and the
//! rate-limit retry policy. Retry applies only here, to idempotent reads —
//! write operations go through the executor directly and are never
//! re-issued. A cursor is not meant to be shared; driving it from two
//! threads requires external synchronization.

use std::thread;
use std::time::Duration;

use crate::error::ClientError;
use crate::executor::{Page, RequestExecutor};
use crate::query::Query;
use crate::schema::{Schema, TypedObject};

/// Consecutive rate-limited attempts allowed for one page before the
/// `RateLimit` error is surfaced even with retry enabled.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;

#[derive(Debug)]
enum State {
    Ready(Query),
    Exhausted,
}

/// Stateful iterator over the pages of results for one query.
pub struct Cursor<'c> {
    executor: &'c RequestExecutor,
    schema: &'static Schema,
    state: State,
    pages_fetched: u32,
    retry_on_rate_exceed: bool,
}

impl<'c> Cursor<'c> {
    pub(crate) fn new(
        executor: &'c RequestExecutor,
        schema: &'static Schema,
        query: Query,
    ) -> Self {
        Self {
            executor,
            schema,
            state: State::Ready(query),
            pages_fetched: 0,
            retry_on_rate_exceed: false,
        }
    }

    /// Enables or disables sleeping and retrying when the server responds
    /// with a rate-limit error. Disabled by default, in which case the
    /// `RateLimit` error is surfaced to the caller unchanged.
    pub fn with_rate_limit_retry(mut self, retry: bool) -> Self {
        self.retry_on_rate_exceed = retry;
        self
    }

    /// Restarts iteration from a previously saved continuation token
    /// instead of the first page. Filter parameters are already baked into
    /// the token by the server.
    pub fn resume_from(mut self, token: &str) -> Self {
        if let State::Ready(query) = &self.state {
            self.state = State::Ready(query.with_cursor(token.to_string()));
        }
        self
    }

    /// The continuation token for the next page: `None` before the first
    /// fetch and once the cursor is exhausted. May be persisted and handed
    /// to [`Cursor::resume_from`] to pick up the iteration later.
    pub fn cursor(&self) -> Option<&str> {
        match &self.state {
            State::Ready(query) => query.cursor(),
            State::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }

    /// Number of pages fetched so far by this cursor.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetches and materializes the next page.
    ///
    /// Once the cursor is exhausted this returns an empty page immediately,
    /// without issuing another request. If any item on the page fails
    /// materialization the whole page fails — partial pages are never
    /// returned.
    pub fn next_page(&mut self) -> Result<Vec<TypedObject>, ClientError> {
        let query = match &self.state {
            State::Exhausted => return Ok(Vec::new()),
            State::Ready(query) => query.clone(),
        };

        let page = self.fetch(&query)?;
        let objects = self.schema.materialize_list(&page.results)?;

        self.pages_fetched += 1;
        self.state = match page.next {
            Some(next_url) => State::Ready(query.with_cursor(next_url)),
            None => State::Exhausted,
        };

        Ok(objects)
    }

    /// One page fetch, sleeping and re-issuing on rate-limit responses when
    /// retry is enabled. Gives up after [`MAX_RATE_LIMIT_RETRIES`]
    /// consecutive rate-limited attempts.
    fn fetch(&self, query: &Query) -> Result<Page, ClientError> {
        let mut attempts = 0;
        loop {
            match self.executor.get_page(query) {
                Err(ClientError::RateLimit { retry_after_secs })
                    if self.retry_on_rate_exceed && attempts < MAX_RATE_LIMIT_RETRIES =>
                {
                    tracing::warn!(retry_after_secs, "rate limited, waiting before retrying");
                    thread::sleep(Duration::from_secs(retry_after_secs));
                    attempts += 1;
                }
                result => return result,
            }
        }
    }

    /// The lowest-level iteration primitive: a lazy sequence of pages.
    /// Consuming it advances this cursor; it is finite and not restartable.
    pub fn pages(self) -> Pages<'c> {
        Pages { cursor: self }
    }

    /// Fetches pages until one is non-empty and returns its first object,
    /// or `None` if the result set is empty.
    pub fn first(self) -> Result<Option<TypedObject>, ClientError> {
        for page in self.pages() {
            if let Some(object) = page?.into_iter().next() {
                return Ok(Some(object));
            }
        }
        Ok(None)
    }

    /// Fetches every page and concatenates the results in server order.
    ///
    /// Result volume is bounded only by the query — prefer [`Cursor::pages`]
    /// for result sets that may not fit comfortably in memory.
    pub fn all(self) -> Result<Vec<TypedObject>, ClientError> {
        let mut results = Vec::new();
        for page in self.pages() {
            results.extend(page?);
        }
        Ok(results)
    }
}

/// Iterator over pages of typed objects. See [`Cursor::pages`].
pub struct Pages<'c> {
    cursor: Cursor<'c>,
}

impl Pages<'_> {
    /// Continuation token of the underlying cursor, for saving mid-iteration.
    /// See [`Cursor::cursor`].
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.cursor()
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Vec<TypedObject>, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_exhausted() {
            None
        } else {
            Some(self.cursor.next_page())
        }
    }
}
