//! Transport engine boundary.
//!
//! The engine that performs socket I/O, TLS, redirects, and WebSocket
//! framing is an external collaborator. This module specifies its contract
//! - the [`TransportEngine`] trait and the [`TransportSink`] the core hands
//! it during each pump - and ships a deterministic in-memory engine for
//! tests and examples.
//!
//! ```text
//! ┌──────────────┐   begin / pump / drain / release   ┌──────────────────┐
//! │    Client    │───────────────────────────────────►│ TransportEngine  │
//! │  (registries)│◄───────────────────────────────────│ (sockets, TLS,   │
//! │              │   header / body / message / pull   │  framing)        │
//! └──────────────┘          via TransportSink         └──────────────────┘
//! ```
//!
//! # Handle Ownership
//!
//! The engine owns each native handle until [`TransportEngine::release`] is
//! called - exactly once per handle, only from the garbage-collection phase
//! of an update cycle or from a manual cancel.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `engine` | Engine and sink traits, completion types |
//! | `scripted` | Deterministic in-memory engine for tests |

// ============================================================================
// Submodules
// ============================================================================

/// Engine and sink traits, completion types.
pub mod engine;

/// Deterministic in-memory engine for tests and examples.
pub mod scripted;

// ============================================================================
// Re-exports
// ============================================================================

pub use engine::{Completion, NativeHandle, Outcome, TransportEngine, TransportSink};
pub use scripted::ScriptedEngine;
