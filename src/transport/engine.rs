//! Engine and sink traits at the transport boundary.
//!
//! See the [module docs](crate::transport) for the ownership rules.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Result;
use crate::protocol::Opcode;

// ============================================================================
// NativeHandle
// ============================================================================

/// Opaque token the engine mints for each operation it owns.
///
/// The core never interprets the value; it only maps it back to the owning
/// record when the engine reports data or completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(u64);

impl NativeHandle {
    /// Wraps a raw engine token.
    #[inline]
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw engine token.
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// How a transfer ended, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transfer ran to completion.
    Done {
        /// Response code the engine observed, when it tracks one.
        status: Option<u16>,
    },
    /// The transfer did not complete cleanly.
    TransportError {
        /// Engine-specific description, for logging only.
        message: String,
    },
}

impl Outcome {
    /// Creates a clean completion with a response code.
    #[inline]
    #[must_use]
    pub fn done(status: u16) -> Self {
        Self::Done {
            status: Some(status),
        }
    }

    /// Creates a transport failure outcome.
    #[inline]
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }
}

// ============================================================================
// Completion
// ============================================================================

/// One finished operation, reported by [`TransportEngine::drain_completions`].
#[derive(Debug, Clone)]
pub struct Completion {
    /// The engine handle that finished.
    pub handle: NativeHandle,
    /// How the transfer ended.
    pub outcome: Outcome,
}

// ============================================================================
// TransportSink
// ============================================================================

/// Receives per-handle data events during a pump.
///
/// Implemented by the core; the engine calls these as bytes arrive or as it
/// needs request-body data. All calls happen synchronously inside
/// [`TransportEngine::pump`].
pub trait TransportSink {
    /// One received header line, terminated by the engine.
    fn on_header_line(&mut self, handle: NativeHandle, line: &[u8]);

    /// A chunk of response body bytes.
    fn on_body(&mut self, handle: NativeHandle, bytes: &[u8]);

    /// One complete WebSocket message.
    fn on_message(&mut self, handle: NativeHandle, opcode: Opcode, payload: &[u8]);

    /// Pull-based upload: fill `dst` with request-body bytes.
    ///
    /// Returns the number of bytes written; 0 signals end of body.
    fn read_request_body(&mut self, handle: NativeHandle, dst: &mut [u8]) -> usize;
}

// ============================================================================
// TransportEngine
// ============================================================================

/// Contract of the external multiplexed transport engine.
///
/// The engine owns every native handle it mints until told to release it.
/// Nothing in this trait may block: `pump` drives whatever I/O is ready and
/// returns.
pub trait TransportEngine {
    /// Starts an HTTP exchange; `body_len` is the upload size the sink will
    /// provide via [`TransportSink::read_request_body`] (0 for none).
    fn begin_http(&mut self, method: &str, url: &str, body_len: usize) -> Result<NativeHandle>;

    /// Starts a WebSocket connection.
    fn begin_ws(&mut self, url: &str) -> Result<NativeHandle>;

    /// One non-blocking I/O pass over all live handles.
    ///
    /// Data callbacks fire on `sink` during the call. Returns the number of
    /// handles still running.
    ///
    /// # Errors
    ///
    /// A failure here is fatal to the current cycle only; the caller may
    /// pump again next cycle.
    fn pump(&mut self, sink: &mut dyn TransportSink) -> Result<usize>;

    /// Reports handles that finished since the last pump.
    fn drain_completions(&mut self) -> Vec<Completion>;

    /// Sends one WebSocket frame.
    fn send_frame(&mut self, handle: NativeHandle, opcode: Opcode, payload: &[u8]) -> Result<()>;

    /// Forces the operation to fail; the engine reports the failure through
    /// a later [`drain_completions`](Self::drain_completions).
    fn abort(&mut self, handle: NativeHandle);

    /// Detaches and frees engine-side resources for the handle.
    ///
    /// Called exactly once per handle.
    fn release(&mut self, handle: NativeHandle);
}
