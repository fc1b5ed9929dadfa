//! The per-cycle update state machine.
//!
//! One [`Client::update`] call performs, strictly in this order:
//!
//! 1. **GC, HTTP** - destroy records whose completion was reported last
//!    cycle, releasing their engine handles.
//! 2. **GC, WebSocket** - destroy reported records; clear every surviving
//!    message queue; promote sockets whose handshake finished last cycle to
//!    `Connected`, firing the connect callback.
//! 3. **Pump** - one non-blocking pass of the transport engine. Data lands
//!    in record buffers through [`PumpSink`]; message and fallback-connect
//!    callbacks are dispatched right after the pump returns, in arrival
//!    order. Operations whose buffers overflowed are aborted.
//! 4. **Drain** - translate engine completions into terminal callbacks and
//!    mark the records for collection on the *next* cycle, keeping them
//!    queryable in between.
//!
//! No callback ever fires outside these phases, and no record is destroyed
//! outside phase 1-2, which is what makes it safe for callbacks to touch
//! other live records.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::client::{Client, Delegate, Limits, Owner};
use crate::error::{Error, Result};
use crate::identifiers::{HandleAllocator, MessageId, RequestId, SocketId};
use crate::protocol::header::{self, HeaderEvent};
use crate::protocol::Opcode;
use crate::registry::Registry;
use crate::registry::http::{HttpRecord, Status};
use crate::registry::socket::{SocketRecord, SocketState};
use crate::transport::{Completion, NativeHandle, Outcome, TransportSink};

// ============================================================================
// Update Entry Point
// ============================================================================

impl Client {
    /// Runs one update cycle; the only place callbacks fire.
    ///
    /// Call this periodically. Nothing blocks: the transport is pumped once
    /// for whatever I/O is ready, and everything that completed is reported
    /// through the delegate before the call returns.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the pump itself failed - fatal to this
    ///   cycle only, retry on the next one
    /// - [`Error::NestedUpdate`] when called from inside a callback
    pub fn update(&mut self) -> Result<()> {
        if self.in_update {
            return Err(Error::NestedUpdate);
        }
        let Some(mut delegate) = self.delegate.take() else {
            return Err(Error::NestedUpdate);
        };
        self.in_update = true;

        let result = self.run_cycle(delegate.as_mut());

        self.in_update = false;
        if self.delegate.is_none() {
            // A callback may have installed a replacement mid-cycle; keep it.
            self.delegate = Some(delegate);
        }
        result
    }

    fn run_cycle(&mut self, delegate: &mut dyn Delegate) -> Result<()> {
        self.collect_http();
        self.collect_sockets(delegate);

        let (events, aborts) = self.pump_transport()?;
        for native in aborts {
            self.engine.abort(native);
        }
        self.dispatch_pump_events(delegate, events);
        self.drain_completions(delegate);

        self.released.clear();
        Ok(())
    }
}

// ============================================================================
// Phase 1-2: Garbage Collection and Promotion
// ============================================================================

impl Client {
    /// Destroys HTTP records whose completion was reported last cycle.
    fn collect_http(&mut self) {
        let finished = self.http.drain_where(|record| record.finished);
        if !finished.is_empty() {
            debug!(count = finished.len(), "collecting finished HTTP records");
        }
        for record in finished {
            self.release_native(record.native);
        }
    }

    /// Destroys reported sockets, clears message queues, and promotes
    /// handshaken sockets to `Connected`.
    fn collect_sockets(&mut self, delegate: &mut dyn Delegate) {
        let finished = self.sockets.drain_where(|record| record.finished);
        if !finished.is_empty() {
            debug!(count = finished.len(), "collecting finished WebSocket records");
        }
        for record in finished {
            self.release_native(record.native);
        }

        let mut promotions = Vec::new();
        for record in self.sockets.iter_mut() {
            // Queued messages had their chance to be fetched last cycle.
            record.clear_messages();
            if record.headers_done && record.state == SocketState::New {
                promotions.push(record.id);
            }
        }
        for socket in promotions {
            // Re-check: an earlier connect callback may have removed or
            // advanced this record.
            let Some(record) = self.sockets.get_mut(socket.get()) else {
                continue;
            };
            if record.state != SocketState::New {
                continue;
            }
            record.state = SocketState::Connected;
            debug!(socket = %socket, "WebSocket connected");
            delegate.on_ws_connect(self, socket);
        }
    }
}

// ============================================================================
// Phase 3: Pump
// ============================================================================

impl Client {
    /// One non-blocking pass of the engine, feeding record buffers.
    fn pump_transport(&mut self) -> Result<(Vec<PumpEvent>, Vec<NativeHandle>)> {
        let Client {
            engine,
            http,
            sockets,
            owners,
            allocator,
            limits,
            ..
        } = self;
        let mut sink = PumpSink {
            http,
            sockets,
            owners,
            allocator,
            limits: *limits,
            events: Vec::new(),
            aborts: Vec::new(),
        };
        let running = engine.pump(&mut sink)?;
        trace!(running, "transport pumped");
        Ok((sink.events, sink.aborts))
    }

    /// Fires message and fallback-connect callbacks queued during the pump.
    fn dispatch_pump_events(&mut self, delegate: &mut dyn Delegate, events: Vec<PumpEvent>) {
        for event in events {
            match event {
                PumpEvent::Connect(socket) => {
                    // Skip if a callback already disconnected the socket.
                    if self.sockets.get(socket.get()).is_some() {
                        debug!(socket = %socket, "WebSocket connected (message fallback)");
                        delegate.on_ws_connect(self, socket);
                    }
                }
                PumpEvent::Message {
                    socket,
                    message,
                    len,
                } => {
                    let alive = self
                        .sockets
                        .get(socket.get())
                        .is_some_and(|record| record.message(message).is_some());
                    if alive {
                        delegate.on_ws_message(self, socket, message, len);
                    }
                }
            }
        }
    }
}

// ============================================================================
// Phase 4: Drain
// ============================================================================

impl Client {
    /// Translates engine completions into terminal callbacks.
    fn drain_completions(&mut self, delegate: &mut dyn Delegate) {
        for Completion {
            handle: native,
            outcome,
        } in self.engine.drain_completions()
        {
            match self.owners.get(&native).copied() {
                Some(Owner::Http(id)) => self.finish_http(delegate, id, outcome),
                Some(Owner::Socket(id)) => self.finish_socket(delegate, id),
                None => {
                    // Should not normally occur; discard by releasing the
                    // handle, unless this cycle already released it.
                    if !self.released.contains(&native) {
                        warn!(%native, "completion for untracked handle, releasing");
                        self.release_native(native);
                    }
                }
            }
        }
    }

    fn finish_http(&mut self, delegate: &mut dyn Delegate, request: RequestId, outcome: Outcome) {
        let Some(record) = self.http.get_mut(request.get()) else {
            return;
        };
        if record.finished {
            return;
        }
        record.finished = true;
        record.status = match outcome {
            Outcome::Done { status } => {
                let code = status
                    .filter(|code| (100..=999).contains(code))
                    .or(record.parsed_status);
                match code {
                    Some(code) => Status::Done(code),
                    None => Status::Failed,
                }
            }
            Outcome::TransportError { message } => {
                debug!(request = %request, error = %message, "HTTP transfer failed");
                Status::Failed
            }
        };

        let status = record.status;
        let body_len = record.body.len();
        debug!(request = %request, ?status, body_len, "HTTP response complete");
        delegate.on_http_response(self, request, status, body_len);
    }

    fn finish_socket(&mut self, delegate: &mut dyn Delegate, socket: SocketId) {
        let Some(record) = self.sockets.get_mut(socket.get()) else {
            return;
        };
        if record.finished {
            return;
        }
        record.finished = true;
        record.state = SocketState::Disconnected;
        debug!(socket = %socket, "WebSocket disconnected");
        delegate.on_ws_disconnect(self, socket);
    }
}

// ============================================================================
// PumpEvent
// ============================================================================

/// Delegate-visible event observed during a pump, dispatched right after.
#[derive(Debug)]
enum PumpEvent {
    /// Connect synthesized from message arrival (the handshake signal was
    /// missed); always precedes the message it was synthesized from.
    Connect(SocketId),
    /// A message was enqueued on its socket.
    Message {
        socket: SocketId,
        message: MessageId,
        len: usize,
    },
}

// ============================================================================
// PumpSink
// ============================================================================

/// Routes engine data events into record buffers during a pump.
struct PumpSink<'a> {
    http: &'a mut Registry<HttpRecord>,
    sockets: &'a mut Registry<SocketRecord>,
    owners: &'a FxHashMap<NativeHandle, Owner>,
    allocator: &'a mut HandleAllocator,
    limits: Limits,
    /// Delegate-visible events, dispatched after the pump returns.
    events: Vec<PumpEvent>,
    /// Handles whose buffers overflowed; told to fail after the pump.
    aborts: Vec<NativeHandle>,
}

impl PumpSink<'_> {
    fn http_record(&mut self, handle: NativeHandle) -> Option<&mut HttpRecord> {
        match self.owners.get(&handle) {
            Some(Owner::Http(id)) => self.http.get_mut(id.get()),
            _ => None,
        }
    }

    fn socket_record(&mut self, handle: NativeHandle) -> Option<&mut SocketRecord> {
        match self.owners.get(&handle) {
            Some(Owner::Socket(id)) => self.sockets.get_mut(id.get()),
            _ => None,
        }
    }
}

impl TransportSink for PumpSink<'_> {
    fn on_header_line(&mut self, handle: NativeHandle, line: &[u8]) {
        match self.owners.get(&handle) {
            Some(Owner::Http(_)) => {
                let Some(record) = self.http_record(handle) else {
                    return;
                };
                if record.aborted || record.finished {
                    return;
                }
                match header::classify(line) {
                    HeaderEvent::Field(field) => {
                        if let Err(e) = record.push_header(field) {
                            warn!(request = %record.id, error = %e, "header storage failed, aborting transfer");
                            record.aborted = true;
                            self.aborts.push(handle);
                        }
                    }
                    HeaderEvent::Status(code) => record.parsed_status = Some(code),
                    HeaderEvent::End => {}
                }
            }
            Some(Owner::Socket(_)) => {
                let Some(record) = self.socket_record(handle) else {
                    return;
                };
                if record.state == SocketState::New && header::classify(line) == HeaderEvent::End {
                    // The engine's send primitive is unreliable right at
                    // handshake completion; announce on the next cycle.
                    record.headers_done = true;
                    trace!(socket = %record.id, "WebSocket handshake headers complete");
                }
            }
            None => trace!(%handle, "header line for untracked handle"),
        }
    }

    fn on_body(&mut self, handle: NativeHandle, bytes: &[u8]) {
        let Some(record) = self.http_record(handle) else {
            trace!(%handle, "body bytes for untracked handle");
            return;
        };
        if record.aborted || record.finished {
            return;
        }
        if let Err(e) = record.body.append(bytes) {
            // Partial data is worse than no data: fail the whole transfer.
            warn!(request = %record.id, error = %e, "body storage failed, aborting transfer");
            record.aborted = true;
            self.aborts.push(handle);
        }
    }

    fn on_message(&mut self, handle: NativeHandle, opcode: Opcode, payload: &[u8]) {
        let limit = self.limits.max_message_len;
        let message = match self.allocator.allocate() {
            Ok(raw) => MessageId::from_raw(raw),
            Err(e) => {
                warn!(%handle, error = %e, "dropping message, handle space exhausted");
                return;
            }
        };
        let Some(record) = self.socket_record(handle) else {
            trace!(%handle, "message for untracked handle");
            return;
        };
        if record.finished {
            return;
        }
        let socket = record.id;
        if let Err(e) = record.push_message(message, opcode, payload, limit) {
            warn!(socket = %socket, error = %e, "message storage failed, aborting connection");
            self.aborts.push(handle);
            return;
        }
        if record.state == SocketState::New {
            // Connect signal was missed; synthesize it so connect precedes
            // the message and still fires exactly once.
            record.state = SocketState::Connected;
            self.events.push(PumpEvent::Connect(socket));
        }
        self.events.push(PumpEvent::Message {
            socket,
            message,
            len: payload.len(),
        });
    }

    fn read_request_body(&mut self, handle: NativeHandle, dst: &mut [u8]) -> usize {
        match self.http_record(handle) {
            Some(record) => record.upload.read_into(dst),
            None => 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
