//! HTTP request records.

// ============================================================================
// Imports
// ============================================================================

use crate::buffer::{ByteBuffer, UploadBuffer};
use crate::error::Result;
use crate::identifiers::{RawHandle, RequestId};
use crate::protocol::header;
use crate::transport::NativeHandle;

use super::Keyed;

// ============================================================================
// Status
// ============================================================================

/// Terminal status of an HTTP exchange.
///
/// Stays [`Status::Pending`] until exactly one of success or transport
/// failure is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No terminal event observed yet.
    Pending,
    /// The exchange completed with this HTTP status code.
    Done(u16),
    /// The transfer did not complete cleanly; no status is available.
    Failed,
}

impl Status {
    /// Returns the HTTP status code, if the exchange completed with one.
    #[inline]
    #[must_use]
    pub fn code(self) -> Option<u16> {
        match self {
            Self::Done(code) => Some(code),
            _ => None,
        }
    }

    /// Returns `true` once a terminal event was observed.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// ============================================================================
// HttpRecord
// ============================================================================

/// Bookkeeping record of one HTTP exchange.
#[derive(Debug)]
pub(crate) struct HttpRecord {
    /// Caller-visible handle, immutable.
    pub(crate) id: RequestId,
    /// The transport engine's handle for this exchange.
    pub(crate) native: NativeHandle,
    /// Terminal status; also set early from the parsed status line.
    pub(crate) status: Status,
    /// Status code parsed from the status line, kept separate so the
    /// engine-reported code takes precedence at completion.
    pub(crate) parsed_status: Option<u16>,
    /// Raw `"Key: value"` header lines, in arrival order.
    pub(crate) headers: Vec<String>,
    /// Accumulated response body.
    pub(crate) body: ByteBuffer,
    /// Request body with read cursor, for pull-based upload.
    pub(crate) upload: UploadBuffer,
    /// Set once the terminal callback was reported; the record is destroyed
    /// on the next cycle's GC pass.
    pub(crate) finished: bool,
    /// Set when a buffer append failed and the engine was told to fail the
    /// transfer; further data for this record is ignored.
    pub(crate) aborted: bool,
}

impl HttpRecord {
    /// Creates a pending record.
    pub(crate) fn new(id: RequestId, native: NativeHandle, upload: UploadBuffer, body_limit: Option<usize>) -> Self {
        Self {
            id,
            native,
            status: Status::Pending,
            parsed_status: None,
            headers: Vec::new(),
            body: ByteBuffer::with_limit(body_limit),
            upload,
            finished: false,
            aborted: false,
        }
    }

    /// Stores one raw header line.
    pub(crate) fn push_header(&mut self, line: String) -> Result<()> {
        self.headers.try_reserve(1)?;
        self.headers.push(line);
        Ok(())
    }

    /// Looks up a header value by key, ASCII case-insensitive.
    pub(crate) fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|line| header::header_value(line, key))
    }
}

impl Keyed for HttpRecord {
    fn key(&self) -> RawHandle {
        self.id.get()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> HttpRecord {
        HttpRecord::new(
            RequestId::new(1).expect("valid handle"),
            NativeHandle::new(10),
            UploadBuffer::default(),
            None,
        )
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Status::Done(200).code(), Some(200));
        assert_eq!(Status::Pending.code(), None);
        assert_eq!(Status::Failed.code(), None);
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!Status::Pending.is_terminal());
        assert!(Status::Done(404).is_terminal());
        assert!(Status::Failed.is_terminal());
    }

    #[test]
    fn test_header_lookup_in_arrival_order() {
        let mut rec = record();
        rec.push_header("Set-Cookie: a=1".to_string()).expect("push");
        rec.push_header("Set-Cookie: b=2".to_string()).expect("push");
        assert_eq!(rec.header("set-cookie"), Some("a=1"));
    }

    #[test]
    fn test_header_lookup_exact_key() {
        let mut rec = record();
        rec.push_header("Content-Type: text/plain".to_string())
            .expect("push");
        assert_eq!(rec.header("Content"), None);
        assert_eq!(rec.header("content-TYPE"), Some("text/plain"));
    }
}
