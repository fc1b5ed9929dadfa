//! webmux - Poll-driven HTTP and WebSocket multiplexing client.
//!
//! This library sits between an application and a non-blocking, multiplexed
//! network transport. It tracks many concurrent HTTP exchanges and WebSocket
//! connections, identifies them by small integer handles instead of native
//! connection objects, and translates raw transport completion events into a
//! small, stable callback interface.
//!
//! # Architecture
//!
//! The layer is cooperative and single-threaded:
//!
//! - **Caller**: submits requests and connects, then calls
//!   [`Client::update`] once per cycle
//! - **Core**: registries keyed by handle, per-cycle garbage collection,
//!   response/message buffering, the connect-timing state machine
//! - **Transport engine**: external collaborator behind the
//!   [`TransportEngine`](transport::TransportEngine) trait; performs the
//!   actual socket I/O, TLS, redirects, and WebSocket framing
//!
//! Key design principles:
//!
//! - Handles come from one strictly increasing counter, shared by requests,
//!   sockets, and messages, and are never reused
//! - Destruction of completed operations is deferred one cycle, so response
//!   data stays valid until the caller has had a chance to read it
//! - All callbacks fire synchronously inside `update`, never re-entrantly
//!   from inside another callback's data structures
//! - Nothing blocks: one non-blocking transport pump per cycle
//!
//! # Quick Start
//!
//! ```
//! use webmux::transport::ScriptedEngine;
//! use webmux::{Client, Delegate, RequestId, Result, Status};
//!
//! struct Printer;
//!
//! impl Delegate for Printer {
//!     fn on_http_response(
//!         &mut self,
//!         client: &mut Client,
//!         request: RequestId,
//!         status: Status,
//!         body_len: usize,
//!     ) {
//!         let body = client.http_body(request).unwrap_or_default();
//!         println!("{request}: {status:?} ({body_len} bytes) {body:?}");
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     // Swap ScriptedEngine for a real transport engine implementation.
//!     let mut client = Client::builder()
//!         .engine(Box::new(ScriptedEngine::new()))
//!         .delegate(Box::new(Printer))
//!         .build()?;
//!
//!     let _request = client.http_get("https://example.com/")?;
//!     client.update()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`], [`Delegate`], the update cycle |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe handle wrappers |
//! | [`protocol`] | Header-line classification, message opcodes |
//! | [`registry`] | Sorted record registries (internal) |
//! | [`transport`] | Transport engine boundary and scripted test engine |
//!
//! # Lifecycle Guarantees
//!
//! - For any handle, at most one terminal callback (response or disconnect)
//!   ever fires, at most once, and only via [`Client::update`]
//! - A record reported in cycle *N* stays queryable until the start of
//!   cycle *N+1*
//! - WebSocket messages delivered in cycle *N* are fetchable until the start
//!   of cycle *N+1*, then dropped silently
//! - Manual cancellation fires no callback; callers must not assume every
//!   handle eventually yields one

// ============================================================================
// Modules
// ============================================================================

/// Client entry point and update cycle.
///
/// Use [`Client::builder()`] to create a configured client instance.
pub mod client;

/// Growable record buffers (internal).
mod buffer;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for multiplexed operations.
///
/// Newtype wrappers prevent mixing incompatible handles at compile time.
pub mod identifiers;

/// Wire-level vocabulary: header classification, opcodes.
pub mod protocol;

/// Sorted registries of operation records.
///
/// Internal except for the record types surfaced through queries.
pub mod registry;

/// Transport engine boundary.
///
/// Defines the [`TransportEngine`](transport::TransportEngine) contract and
/// ships [`ScriptedEngine`](transport::ScriptedEngine) for tests.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, Delegate, Limits};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{MessageId, RequestId, SocketId};

// Record types surfaced through queries
pub use registry::http::Status;
pub use registry::socket::{Message, SocketState};

// Wire vocabulary
pub use protocol::Opcode;
