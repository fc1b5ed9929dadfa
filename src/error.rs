//! Error types for webmux.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webmux::{Result, Client};
//!
//! fn example(client: &mut Client) -> Result<()> {
//!     let request = client.http_get("https://example.com/")?;
//!     client.update()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Caller | [`Error::InvalidArgument`] |
//! | Exhaustion | [`Error::ExhaustedHandles`], [`Error::OutOfMemory`], [`Error::LimitExceeded`] |
//! | Lookup | [`Error::RequestNotFound`], [`Error::SocketNotFound`] |
//! | Transport | [`Error::Transport`] |
//! | Cycle | [`Error::NestedUpdate`] |
//!
//! Transport failures of individual operations are *not* errors: they surface
//! asynchronously as a terminal callback (a [`Status::Failed`] response or a
//! disconnect) during [`Client::update`].
//!
//! [`Status::Failed`]: crate::Status::Failed
//! [`Client::update`]: crate::Client::update

// ============================================================================
// Imports
// ============================================================================

use std::collections::TryReserveError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{RequestId, SocketId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Invalid argument to a submission call.
    ///
    /// Returned synchronously; no record is created.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Exhaustion Errors
    // ========================================================================
    /// The shared handle counter is exhausted.
    ///
    /// Handles are never reused, so once the counter overflows the client is
    /// permanently unable to create new requests, sockets, or messages.
    #[error("Handle space exhausted")]
    ExhaustedHandles,

    /// Buffer allocation failed.
    ///
    /// The owning operation is aborted rather than left with truncated data.
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    /// A configured size limit was exceeded.
    ///
    /// The owning operation is aborted rather than left with truncated data.
    #[error("Size limit exceeded: {len} bytes over limit {limit}")]
    LimitExceeded {
        /// Size the buffer would have reached.
        len: usize,
        /// The configured limit.
        limit: usize,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No live HTTP request with the given handle.
    #[error("Request not found: {request}")]
    RequestNotFound {
        /// The missing request handle.
        request: RequestId,
    },

    /// No live WebSocket with the given handle.
    #[error("Socket not found: {socket}")]
    SocketNotFound {
        /// The missing socket handle.
        socket: SocketId,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The transport engine itself failed.
    ///
    /// Returned by [`Client::update`](crate::Client::update) when the pump
    /// step could not run, and by frame sends the engine rejects. Fatal to
    /// the cycle, not to the client; the caller may retry next cycle.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Cycle Errors
    // ========================================================================
    /// `update` was re-entered from a delegate callback.
    #[error("update() re-entered from a callback")]
    NestedUpdate,
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a size limit error.
    #[inline]
    pub fn limit_exceeded(len: usize, limit: usize) -> Self {
        Self::LimitExceeded { len, limit }
    }

    /// Creates a request not found error.
    #[inline]
    pub fn request_not_found(request: RequestId) -> Self {
        Self::RequestNotFound { request }
    }

    /// Creates a socket not found error.
    #[inline]
    pub fn socket_not_found(socket: SocketId) -> Self {
        Self::SocketNotFound { socket }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a caller error (bad argument or config).
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidArgument { .. })
    }

    /// Returns `true` if this is a resource exhaustion error.
    #[inline]
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::ExhaustedHandles | Self::OutOfMemory(_) | Self::LimitExceeded { .. }
        )
    }

    /// Returns `true` if this is a lookup error for a dead or unknown handle.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RequestNotFound { .. } | Self::SocketNotFound { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// A transport pump failure is fatal to the cycle only; the caller may
    /// retry on the next cycle.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::transport("pump failed");
        assert_eq!(err.to_string(), "Transport error: pump failed");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing transport engine");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing transport engine"
        );
    }

    #[test]
    fn test_limit_exceeded_display() {
        let err = Error::limit_exceeded(2048, 1024);
        assert_eq!(
            err.to_string(),
            "Size limit exceeded: 2048 bytes over limit 1024"
        );
    }

    #[test]
    fn test_is_caller_error() {
        assert!(Error::invalid_argument("empty url").is_caller_error());
        assert!(Error::config("no engine").is_caller_error());
        assert!(!Error::ExhaustedHandles.is_caller_error());
    }

    #[test]
    fn test_is_exhaustion() {
        assert!(Error::ExhaustedHandles.is_exhaustion());
        assert!(Error::limit_exceeded(10, 5).is_exhaustion());
        assert!(!Error::NestedUpdate.is_exhaustion());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::transport("pump failed").is_recoverable());
        assert!(!Error::ExhaustedHandles.is_recoverable());
    }

    #[test]
    fn test_not_found_predicates() {
        let request = RequestId::new(7).expect("valid handle");
        let err = Error::request_not_found(request);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Request not found: 7");
    }
}
