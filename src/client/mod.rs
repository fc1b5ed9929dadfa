//! Client entry point: handle bookkeeping over a multiplexed transport.
//!
//! A [`Client`] tracks many concurrent HTTP exchanges and WebSocket
//! connections, identified by small integer handles, and translates raw
//! transport completion events into [`Delegate`] callbacks from a single
//! cooperative [`Client::update`] call per cycle.
//!
//! # Lifecycle Guarantees
//!
//! - Handles come from one strictly increasing counter and are never reused.
//! - A completed record stays queryable from its terminal callback until the
//!   *next* `update` call, which garbage-collects it.
//! - At most one terminal callback (response or disconnect) fires per
//!   handle, at most once, and only from inside `update`.
//! - Manual cancellation (discard, disconnect) is synchronous and fires no
//!   callback.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | HTTP submission and queries |
//! | `socket` | WebSocket connect, send, and message fetch |
//! | `update` | The per-cycle GC/promote/pump/drain state machine |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP submission and queries.
mod http;

/// WebSocket operations.
mod socket;

/// The update/GC cycle.
mod update;

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{HandleAllocator, MessageId, RequestId, SocketId};
use crate::registry::Registry;
use crate::registry::http::{HttpRecord, Status};
use crate::registry::socket::SocketRecord;
use crate::transport::{NativeHandle, TransportEngine};

// ============================================================================
// Delegate
// ============================================================================

/// Callbacks fired during [`Client::update`].
///
/// All methods default to no-ops. Callbacks execute synchronously on the
/// `update` call stack and receive the client back, so they may query or
/// mutate live records - including disconnecting a WebSocket or submitting
/// new work. They must not re-enter `update` (rejected with
/// [`Error::NestedUpdate`]).
pub trait Delegate {
    /// An HTTP exchange reached its terminal state.
    ///
    /// `status` is never [`Status::Pending`]. The record stays queryable
    /// until the next `update` call.
    fn on_http_response(
        &mut self,
        client: &mut Client,
        request: RequestId,
        status: Status,
        body_len: usize,
    ) {
        let _ = (client, request, status, body_len);
    }

    /// A WebSocket finished its handshake and is safe to send on.
    ///
    /// Fires at most once per socket.
    fn on_ws_connect(&mut self, client: &mut Client, socket: SocketId) {
        let _ = (client, socket);
    }

    /// A WebSocket connection ended.
    ///
    /// May fire without a prior connect if the handshake failed. The record
    /// and its final messages stay queryable until the next `update` call.
    fn on_ws_disconnect(&mut self, client: &mut Client, socket: SocketId) {
        let _ = (client, socket);
    }

    /// A WebSocket message arrived.
    ///
    /// Fetch it with [`Client::ws_message`] before the next `update` call;
    /// unfetched messages are dropped silently at the start of the next
    /// cycle.
    fn on_ws_message(
        &mut self,
        client: &mut Client,
        socket: SocketId,
        message: MessageId,
        len: usize,
    ) {
        let _ = (client, socket, message, len);
    }
}

/// Delegate that ignores every event.
struct NoopDelegate;

impl Delegate for NoopDelegate {}

// ============================================================================
// Limits
// ============================================================================

/// Optional size limits on accumulated data.
///
/// Exceeding a limit aborts the owning operation through the transport
/// engine; the failure then surfaces as a normal terminal callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Cap on one HTTP response body, in bytes.
    pub max_body_len: Option<usize>,
    /// Cap on one WebSocket message payload, in bytes.
    pub max_message_len: Option<usize>,
}

// ============================================================================
// Owner
// ============================================================================

/// Which record a native transport handle belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Owner {
    Http(RequestId),
    Socket(SocketId),
}

// ============================================================================
// Client
// ============================================================================

/// Bookkeeping layer over a non-blocking multiplexed transport.
///
/// Owns the handle allocator, both registries, and the transport engine.
/// Single-threaded and cooperative: nothing blocks, and no callback fires
/// outside [`Client::update`].
///
/// # Example
///
/// ```
/// use webmux::transport::ScriptedEngine;
/// use webmux::{Client, Result};
///
/// fn example() -> Result<()> {
///     let mut client = Client::builder()
///         .engine(Box::new(ScriptedEngine::new()))
///         .build()?;
///
///     let request = client.http_get("https://example.com/")?;
///     client.update()?;
///     let _status = client.http_status(request)?;
///     Ok(())
/// }
/// # example().unwrap();
/// ```
pub struct Client {
    /// Shared monotonic handle counter for all entity kinds.
    pub(crate) allocator: HandleAllocator,
    /// In-flight and completed HTTP records.
    pub(crate) http: Registry<HttpRecord>,
    /// Live WebSocket records.
    pub(crate) sockets: Registry<SocketRecord>,
    /// Native handle to record resolution.
    pub(crate) owners: FxHashMap<NativeHandle, Owner>,
    /// Native handles released since the last completed cycle; guards the
    /// untracked-completion path against releasing twice.
    pub(crate) released: FxHashSet<NativeHandle>,
    /// The external transport engine.
    pub(crate) engine: Box<dyn TransportEngine>,
    /// Event callbacks; taken out for the duration of dispatch.
    pub(crate) delegate: Option<Box<dyn Delegate>>,
    /// Configured size limits.
    pub(crate) limits: Limits,
    /// Guards against `update` re-entry from callbacks.
    pub(crate) in_update: bool,
}

impl core::fmt::Debug for Client {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("allocator", &self.allocator)
            .field("http", &self.http)
            .field("sockets", &self.sockets)
            .field("owners", &self.owners)
            .field("released", &self.released)
            .field("engine", &"<dyn TransportEngine>")
            .field("delegate", &self.delegate.as_ref().map(|_| "<dyn Delegate>"))
            .field("limits", &self.limits)
            .field("in_update", &self.in_update)
            .finish()
    }
}

impl Client {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Replaces the delegate, returning the previous one.
    pub fn set_delegate(&mut self, delegate: Box<dyn Delegate>) -> Box<dyn Delegate> {
        self.delegate
            .replace(delegate)
            .unwrap_or(Box::new(NoopDelegate))
    }

    /// Releases a native handle and remembers it for the double-release
    /// guard in the drain phase.
    pub(crate) fn release_native(&mut self, native: NativeHandle) {
        self.owners.remove(&native);
        self.released.insert(native);
        self.engine.release(native);
    }
}

impl Drop for Client {
    /// Tears down every live operation with no callbacks.
    fn drop(&mut self) {
        let live = self.http.len() + self.sockets.len();
        if live > 0 {
            debug!(live, "client dropped with live operations");
        }
        for record in self.http.drain_all() {
            self.engine.release(record.native);
        }
        for record in self.sockets.drain_all() {
            self.engine.release(record.native);
        }
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder. A transport engine is
/// required; the delegate and limits are optional.
#[derive(Default)]
pub struct ClientBuilder {
    /// Transport engine, required.
    engine: Option<Box<dyn TransportEngine>>,
    /// Event callbacks; defaults to a no-op delegate.
    delegate: Option<Box<dyn Delegate>>,
    /// Size limits; defaults to unlimited.
    limits: Limits,
}

impl ClientBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport engine.
    #[inline]
    #[must_use]
    pub fn engine(mut self, engine: Box<dyn TransportEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the delegate receiving callbacks.
    #[inline]
    #[must_use]
    pub fn delegate(mut self, delegate: Box<dyn Delegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Sets all size limits at once.
    #[inline]
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Caps accumulated HTTP response bodies.
    #[inline]
    #[must_use]
    pub fn max_body_len(mut self, limit: usize) -> Self {
        self.limits.max_body_len = Some(limit);
        self
    }

    /// Caps individual WebSocket message payloads.
    #[inline]
    #[must_use]
    pub fn max_message_len(mut self, limit: usize) -> Self {
        self.limits.max_message_len = Some(limit);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if no transport engine was set.
    pub fn build(self) -> Result<Client> {
        let engine = self
            .engine
            .ok_or_else(|| Error::config("transport engine is required"))?;
        Ok(Client {
            allocator: HandleAllocator::new(),
            http: Registry::new(),
            sockets: Registry::new(),
            owners: FxHashMap::default(),
            released: FxHashSet::default(),
            engine,
            delegate: Some(self.delegate.unwrap_or(Box::new(NoopDelegate))),
            limits: self.limits,
            in_update: false,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedEngine;

    #[test]
    fn test_build_requires_engine() {
        let err = Client::builder().build().expect_err("engine is required");
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_build_with_defaults() {
        let client = Client::builder()
            .engine(Box::new(ScriptedEngine::new()))
            .build()
            .expect("build");
        assert_eq!(client.limits, Limits::default());
        assert_eq!(client.http_ids().count(), 0);
        assert_eq!(client.ws_ids().count(), 0);
    }

    #[test]
    fn test_builder_limits() {
        let client = Client::builder()
            .engine(Box::new(ScriptedEngine::new()))
            .max_body_len(1024)
            .max_message_len(256)
            .build()
            .expect("build");
        assert_eq!(client.limits.max_body_len, Some(1024));
        assert_eq!(client.limits.max_message_len, Some(256));
    }

    #[test]
    fn test_drop_releases_live_operations() {
        let script = ScriptedEngine::new();
        let mut client = Client::builder()
            .engine(Box::new(script.clone()))
            .build()
            .expect("build");
        client.http_get("https://example.com/").expect("submit");
        client.ws_connect("wss://example.com/feed").expect("connect");
        assert_eq!(script.live_count(), 2);

        drop(client);
        assert_eq!(script.live_count(), 0);
        assert_eq!(script.released().len(), 2);
    }
}
