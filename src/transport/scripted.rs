//! Deterministic in-memory transport engine.
//!
//! [`ScriptedEngine`] performs no I/O. Tests (and doc examples) script the
//! events each pump should deliver - header lines, body chunks, messages,
//! completions - and assert afterwards on what the core asked the engine to
//! do. The engine is a shared handle: clone it, give one clone to the
//! client, and keep the other to drive the script.
//!
//! ```
//! use webmux::transport::{Outcome, ScriptedEngine, TransportEngine};
//!
//! let script = ScriptedEngine::new();
//! let mut engine = script.clone();
//!
//! let native = engine.begin_http("GET", "https://example.com/", 0).unwrap();
//! script.push_header(native, b"HTTP/1.1 200 OK\r\n");
//! script.push_body(native, b"hi");
//! script.complete(native, Outcome::done(200));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Opcode;

use super::engine::{Completion, NativeHandle, Outcome, TransportEngine, TransportSink};

// ============================================================================
// StartedOp
// ============================================================================

/// Record of one `begin_http` / `begin_ws` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedOp {
    /// Handle the engine minted for the operation.
    pub handle: NativeHandle,
    /// `"GET"`, `"POST"`, ... or `"WS"` for WebSocket connects.
    pub method: String,
    /// Submitted URL.
    pub url: String,
    /// Upload length announced at begin time.
    pub body_len: usize,
}

// ============================================================================
// Script Events
// ============================================================================

#[derive(Debug)]
enum ScriptEvent {
    Header(NativeHandle, Vec<u8>),
    Body(NativeHandle, Vec<u8>),
    Message(NativeHandle, Opcode, Vec<u8>),
    /// Ask the sink for up to this many upload bytes.
    PullBody(NativeHandle, usize),
}

// ============================================================================
// Shared State
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    next_native: u64,
    live: FxHashSet<NativeHandle>,
    started: Vec<StartedOp>,
    events: VecDeque<ScriptEvent>,
    completions: Vec<Completion>,
    released: Vec<NativeHandle>,
    aborted: Vec<NativeHandle>,
    sent: Vec<(NativeHandle, Opcode, Vec<u8>)>,
    uploads: FxHashMap<NativeHandle, Vec<u8>>,
    refuse_sends: FxHashSet<NativeHandle>,
    fail_next_pump: Option<String>,
}

// ============================================================================
// ScriptedEngine
// ============================================================================

/// Shared-handle scripted engine; see the [module docs](self).
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    inner: Rc<RefCell<Inner>>,
}

impl ScriptedEngine {
    /// Creates an engine with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    /// Queues a header line for delivery on the next pump.
    pub fn push_header(&self, handle: NativeHandle, line: &[u8]) {
        self.inner
            .borrow_mut()
            .events
            .push_back(ScriptEvent::Header(handle, line.to_vec()));
    }

    /// Queues a body chunk for delivery on the next pump.
    pub fn push_body(&self, handle: NativeHandle, bytes: &[u8]) {
        self.inner
            .borrow_mut()
            .events
            .push_back(ScriptEvent::Body(handle, bytes.to_vec()));
    }

    /// Queues a WebSocket message for delivery on the next pump.
    pub fn push_message(&self, handle: NativeHandle, opcode: Opcode, payload: &[u8]) {
        self.inner
            .borrow_mut()
            .events
            .push_back(ScriptEvent::Message(handle, opcode, payload.to_vec()));
    }

    /// Makes the next pump pull up to `max` upload bytes from the sink.
    pub fn pull_request_body(&self, handle: NativeHandle, max: usize) {
        self.inner
            .borrow_mut()
            .events
            .push_back(ScriptEvent::PullBody(handle, max));
    }

    /// Queues a completion for the next drain.
    pub fn complete(&self, handle: NativeHandle, outcome: Outcome) {
        self.inner
            .borrow_mut()
            .completions
            .push(Completion { handle, outcome });
    }

    /// Makes the next pump fail with a transport error.
    pub fn fail_next_pump(&self, message: impl Into<String>) {
        self.inner.borrow_mut().fail_next_pump = Some(message.into());
    }

    /// Makes `send_frame` fail for this handle.
    pub fn refuse_sends(&self, handle: NativeHandle) {
        self.inner.borrow_mut().refuse_sends.insert(handle);
    }

    // ========================================================================
    // Assertions
    // ========================================================================

    /// All `begin_http` / `begin_ws` calls, in order.
    #[must_use]
    pub fn started(&self) -> Vec<StartedOp> {
        self.inner.borrow().started.clone()
    }

    /// The most recently minted handle.
    ///
    /// # Panics
    ///
    /// Panics if nothing was started yet.
    #[must_use]
    pub fn last_started(&self) -> NativeHandle {
        self.inner
            .borrow()
            .started
            .last()
            .expect("no operation started")
            .handle
    }

    /// Handles released so far, in release order.
    #[must_use]
    pub fn released(&self) -> Vec<NativeHandle> {
        self.inner.borrow().released.clone()
    }

    /// Handles aborted so far, in abort order.
    #[must_use]
    pub fn aborted(&self) -> Vec<NativeHandle> {
        self.inner.borrow().aborted.clone()
    }

    /// Frames sent so far, in send order.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<(NativeHandle, Opcode, Vec<u8>)> {
        self.inner.borrow().sent.clone()
    }

    /// Upload bytes pulled from the sink for this handle so far.
    #[must_use]
    pub fn uploaded(&self, handle: NativeHandle) -> Vec<u8> {
        self.inner
            .borrow()
            .uploads
            .get(&handle)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of handles begun and not yet released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.borrow().live.len()
    }
}

// ============================================================================
// TransportEngine Implementation
// ============================================================================

impl TransportEngine for ScriptedEngine {
    fn begin_http(&mut self, method: &str, url: &str, body_len: usize) -> Result<NativeHandle> {
        let mut inner = self.inner.borrow_mut();
        inner.next_native += 1;
        let handle = NativeHandle::new(inner.next_native);
        inner.live.insert(handle);
        inner.started.push(StartedOp {
            handle,
            method: method.to_string(),
            url: url.to_string(),
            body_len,
        });
        Ok(handle)
    }

    fn begin_ws(&mut self, url: &str) -> Result<NativeHandle> {
        let mut inner = self.inner.borrow_mut();
        inner.next_native += 1;
        let handle = NativeHandle::new(inner.next_native);
        inner.live.insert(handle);
        inner.started.push(StartedOp {
            handle,
            method: "WS".to_string(),
            url: url.to_string(),
            body_len: 0,
        });
        Ok(handle)
    }

    fn pump(&mut self, sink: &mut dyn TransportSink) -> Result<usize> {
        if let Some(message) = self.inner.borrow_mut().fail_next_pump.take() {
            return Err(Error::transport(message));
        }

        // Deliver everything queued so far, in script order. Events queued
        // while this pump runs wait for the next one.
        let mut events = std::mem::take(&mut self.inner.borrow_mut().events);
        for event in events.drain(..) {
            match event {
                ScriptEvent::Header(handle, line) => sink.on_header_line(handle, &line),
                ScriptEvent::Body(handle, bytes) => sink.on_body(handle, &bytes),
                ScriptEvent::Message(handle, opcode, payload) => {
                    sink.on_message(handle, opcode, &payload);
                }
                ScriptEvent::PullBody(handle, max) => {
                    let mut chunk = vec![0u8; max];
                    let n = sink.read_request_body(handle, &mut chunk);
                    trace!(%handle, pulled = n, "scripted upload pull");
                    self.inner
                        .borrow_mut()
                        .uploads
                        .entry(handle)
                        .or_default()
                        .extend_from_slice(&chunk[..n]);
                }
            }
        }
        Ok(self.inner.borrow().live.len())
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.inner.borrow_mut().completions)
    }

    fn send_frame(&mut self, handle: NativeHandle, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.refuse_sends.contains(&handle) {
            return Err(Error::transport(format!("send refused on handle {handle}")));
        }
        if !inner.live.contains(&handle) {
            return Err(Error::transport(format!("send on dead handle {handle}")));
        }
        inner.sent.push((handle, opcode, payload.to_vec()));
        Ok(())
    }

    fn abort(&mut self, handle: NativeHandle) {
        let mut inner = self.inner.borrow_mut();
        inner.aborted.push(handle);
        // A real engine reports the forced failure on a later drain.
        inner.completions.push(Completion {
            handle,
            outcome: Outcome::transport_error("aborted"),
        });
    }

    fn release(&mut self, handle: NativeHandle) {
        let mut inner = self.inner.borrow_mut();
        inner.live.remove(&handle);
        inner.released.push(handle);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CollectingSink {
        headers: Vec<(NativeHandle, Vec<u8>)>,
        bodies: Vec<(NativeHandle, Vec<u8>)>,
        messages: Vec<(NativeHandle, Opcode, Vec<u8>)>,
        upload: Vec<u8>,
    }

    impl TransportSink for CollectingSink {
        fn on_header_line(&mut self, handle: NativeHandle, line: &[u8]) {
            self.headers.push((handle, line.to_vec()));
        }

        fn on_body(&mut self, handle: NativeHandle, bytes: &[u8]) {
            self.bodies.push((handle, bytes.to_vec()));
        }

        fn on_message(&mut self, handle: NativeHandle, opcode: Opcode, payload: &[u8]) {
            self.messages.push((handle, opcode, payload.to_vec()));
        }

        fn read_request_body(&mut self, _handle: NativeHandle, dst: &mut [u8]) -> usize {
            let n = self.upload.len().min(dst.len());
            dst[..n].copy_from_slice(&self.upload[..n]);
            self.upload.drain(..n);
            n
        }
    }

    #[test]
    fn test_pump_delivers_in_script_order() {
        let script = ScriptedEngine::new();
        let mut engine = script.clone();
        let native = engine.begin_http("GET", "https://example.com/", 0).unwrap();

        script.push_header(native, b"HTTP/1.1 200 OK");
        script.push_body(native, b"hi");

        let mut sink = CollectingSink::default();
        assert_eq!(engine.pump(&mut sink).unwrap(), 1);
        assert_eq!(sink.headers.len(), 1);
        assert_eq!(sink.bodies, vec![(native, b"hi".to_vec())]);

        // Queue drained; a second pump delivers nothing.
        let mut sink = CollectingSink::default();
        engine.pump(&mut sink).unwrap();
        assert!(sink.headers.is_empty() && sink.bodies.is_empty());
    }

    #[test]
    fn test_pull_request_body_records_upload() {
        let script = ScriptedEngine::new();
        let mut engine = script.clone();
        let native = engine.begin_http("PUT", "https://example.com/", 6).unwrap();
        script.pull_request_body(native, 4);
        script.pull_request_body(native, 4);

        let mut sink = CollectingSink {
            upload: b"abcdef".to_vec(),
            ..Default::default()
        };
        engine.pump(&mut sink).unwrap();
        assert_eq!(script.uploaded(native), b"abcdef");
    }

    #[test]
    fn test_fail_next_pump_is_one_shot() {
        let script = ScriptedEngine::new();
        let mut engine = script.clone();
        script.fail_next_pump("engine exhausted");

        let mut sink = CollectingSink::default();
        assert!(engine.pump(&mut sink).is_err());
        assert!(engine.pump(&mut sink).is_ok());
    }

    #[test]
    fn test_abort_queues_failure_completion() {
        let script = ScriptedEngine::new();
        let mut engine = script.clone();
        let native = engine.begin_ws("wss://example.com/").unwrap();

        engine.abort(native);
        let completions = engine.drain_completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].handle, native);
        assert!(matches!(
            completions[0].outcome,
            Outcome::TransportError { .. }
        ));
    }

    #[test]
    fn test_release_updates_live_count() {
        let script = ScriptedEngine::new();
        let mut engine = script.clone();
        let a = engine.begin_http("GET", "https://example.com/a", 0).unwrap();
        let b = engine.begin_http("GET", "https://example.com/b", 0).unwrap();
        assert_eq!(script.live_count(), 2);

        engine.release(a);
        assert_eq!(script.live_count(), 1);
        assert_eq!(script.released(), vec![a]);
        assert!(engine.send_frame(a, Opcode::Text, b"x").is_err());
        engine.release(b);
        assert_eq!(script.live_count(), 0);
    }
}
