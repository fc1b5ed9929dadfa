//! HTTP submission and queries.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;
use url::Url;

use crate::buffer::UploadBuffer;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::registry::http::{HttpRecord, Status};

use super::{Client, Owner};

// ============================================================================
// Submission
// ============================================================================

impl Client {
    /// Submits an HTTP request.
    ///
    /// `method` defaults to `GET` when empty. The URL must parse and use an
    /// `http` or `https` scheme. `body` is copied and streamed to the engine
    /// on demand.
    ///
    /// The returned handle stays valid until the cycle after the response
    /// callback fires, until [`Client::http_discard`], or until the client
    /// is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an unusable URL
    /// - [`Error::ExhaustedHandles`] once the handle counter overflowed
    /// - [`Error::OutOfMemory`] if the body copy fails
    /// - [`Error::Transport`] if the engine rejects the exchange
    pub fn http_request(&mut self, method: &str, url: &str, body: &[u8]) -> Result<RequestId> {
        let method = if method.is_empty() { "GET" } else { method };
        let parsed =
            Url::parse(url).map_err(|e| Error::invalid_argument(format!("bad URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_argument(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let upload = UploadBuffer::new(body)?;
        let native = self.engine.begin_http(method, url, upload.len())?;
        let id = match self.allocator.allocate() {
            Ok(raw) => RequestId::from_raw(raw),
            Err(e) => {
                // Roll back the partially constructed operation.
                self.engine.release(native);
                return Err(e);
            }
        };

        self.http
            .insert(HttpRecord::new(id, native, upload, self.limits.max_body_len));
        self.owners.insert(native, Owner::Http(id));
        debug!(request = %id, method, url, body_len = body.len(), "HTTP request submitted");
        Ok(id)
    }

    /// Submits a GET request with no body.
    #[inline]
    pub fn http_get(&mut self, url: &str) -> Result<RequestId> {
        self.http_request("GET", url, &[])
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Client {
    /// Returns the request's status.
    ///
    /// [`Status::Pending`] until the response callback fires; afterwards the
    /// terminal value, queryable until the next update cycle.
    ///
    /// # Errors
    ///
    /// [`Error::RequestNotFound`] for a dead or unknown handle.
    pub fn http_status(&self, request: RequestId) -> Result<Status> {
        self.http
            .get(request.get())
            .map(|record| record.status)
            .ok_or(Error::request_not_found(request))
    }

    /// Looks up a response header value by key, ASCII case-insensitive.
    ///
    /// The key must match exactly up to the colon: looking up `"Content"`
    /// never matches a `Content-Type` header. Returns `None` if no such
    /// header arrived.
    ///
    /// # Errors
    ///
    /// [`Error::RequestNotFound`] for a dead or unknown handle.
    pub fn http_header(&self, request: RequestId, key: &str) -> Result<Option<&str>> {
        self.http
            .get(request.get())
            .map(|record| record.header(key))
            .ok_or(Error::request_not_found(request))
    }

    /// Returns the response body accumulated so far.
    ///
    /// # Errors
    ///
    /// [`Error::RequestNotFound`] for a dead or unknown handle.
    pub fn http_body(&self, request: RequestId) -> Result<&[u8]> {
        self.http
            .get(request.get())
            .map(|record| record.body.as_slice())
            .ok_or(Error::request_not_found(request))
    }

    /// Iterates the handles of all live requests, including completed ones
    /// pending garbage collection.
    pub fn http_ids(&self) -> impl Iterator<Item = RequestId> {
        self.http.iter().map(|record| record.id)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

impl Client {
    /// Discards a request immediately.
    ///
    /// The engine handle is released and the record destroyed synchronously;
    /// no response callback will ever fire for it.
    ///
    /// # Errors
    ///
    /// [`Error::RequestNotFound`] for a dead or unknown handle.
    pub fn http_discard(&mut self, request: RequestId) -> Result<()> {
        let record = self
            .http
            .remove(request.get())
            .ok_or(Error::request_not_found(request))?;
        self.release_native(record.native);
        debug!(request = %request, "HTTP request discarded");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedEngine;

    fn client_with_script() -> (Client, ScriptedEngine) {
        let script = ScriptedEngine::new();
        let client = Client::builder()
            .engine(Box::new(script.clone()))
            .build()
            .expect("build");
        (client, script)
    }

    #[test]
    fn test_submit_reaches_engine() {
        let (mut client, script) = client_with_script();
        let id = client
            .http_request("POST", "https://example.com/api", b"payload")
            .expect("submit");

        let started = script.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].method, "POST");
        assert_eq!(started[0].url, "https://example.com/api");
        assert_eq!(started[0].body_len, 7);
        assert_eq!(client.http_status(id).expect("status"), Status::Pending);
    }

    #[test]
    fn test_empty_method_defaults_to_get() {
        let (mut client, script) = client_with_script();
        client
            .http_request("", "https://example.com/", &[])
            .expect("submit");
        assert_eq!(script.started()[0].method, "GET");
    }

    #[test]
    fn test_rejects_bad_urls() {
        let (mut client, script) = client_with_script();
        assert!(client.http_get("").is_err());
        assert!(client.http_get("not a url").is_err());
        assert!(client.http_get("ftp://example.com/x").is_err());
        assert!(script.started().is_empty());
    }

    #[test]
    fn test_queries_on_unknown_handle() {
        let (client, _script) = client_with_script();
        let ghost = RequestId::new(99).expect("valid handle");
        assert!(client.http_status(ghost).is_err());
        assert!(client.http_header(ghost, "content-type").is_err());
        assert!(client.http_body(ghost).is_err());
    }

    #[test]
    fn test_discard_releases_engine_handle() {
        let (mut client, script) = client_with_script();
        let id = client.http_get("https://example.com/").expect("submit");
        let native = script.last_started();

        client.http_discard(id).expect("discard");
        assert_eq!(script.released(), vec![native]);
        assert!(client.http_status(id).is_err());
        assert!(client.http_discard(id).is_err());
    }

    #[test]
    fn test_http_ids_enumerates_in_submission_order() {
        let (mut client, _script) = client_with_script();
        let a = client.http_get("https://example.com/a").expect("submit");
        let b = client.http_get("https://example.com/b").expect("submit");
        let ids: Vec<_> = client.http_ids().collect();
        assert_eq!(ids, vec![a, b]);
    }
}
