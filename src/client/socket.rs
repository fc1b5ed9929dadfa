//! WebSocket operations.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{MessageId, SocketId};
use crate::protocol::Opcode;
use crate::registry::socket::{Message, SocketRecord, SocketState};

use super::{Client, Owner};

// ============================================================================
// Connect / Disconnect
// ============================================================================

impl Client {
    /// Opens a WebSocket connection.
    ///
    /// The URL must parse and use a `ws` or `wss` scheme. The connection is
    /// announced via the connect callback one cycle after the handshake
    /// completes; sending before that is not reliable.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an unusable URL
    /// - [`Error::ExhaustedHandles`] once the handle counter overflowed
    /// - [`Error::Transport`] if the engine rejects the connection
    pub fn ws_connect(&mut self, url: &str) -> Result<SocketId> {
        let parsed =
            Url::parse(url).map_err(|e| Error::invalid_argument(format!("bad URL: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::invalid_argument(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let native = self.engine.begin_ws(url)?;
        let id = match self.allocator.allocate() {
            Ok(raw) => SocketId::from_raw(raw),
            Err(e) => {
                // Roll back the partially constructed operation.
                self.engine.release(native);
                return Err(e);
            }
        };

        self.sockets.insert(SocketRecord::new(id, native));
        self.owners.insert(native, Owner::Socket(id));
        debug!(socket = %id, url, "WebSocket connect submitted");
        Ok(id)
    }

    /// Disconnects a WebSocket immediately.
    ///
    /// The engine handle is released and the record destroyed synchronously;
    /// no connect or disconnect callback will ever fire for it. Safe to call
    /// from inside a delegate callback.
    ///
    /// # Errors
    ///
    /// [`Error::SocketNotFound`] for a dead or unknown handle.
    pub fn ws_disconnect(&mut self, socket: SocketId) -> Result<()> {
        let record = self
            .sockets
            .remove(socket.get())
            .ok_or(Error::socket_not_found(socket))?;
        self.release_native(record.native);
        debug!(socket = %socket, "WebSocket disconnected manually");
        Ok(())
    }
}

// ============================================================================
// Send
// ============================================================================

impl Client {
    /// Sends one WebSocket frame.
    ///
    /// Reliable only once the connect callback has fired for the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::SocketNotFound`] for a dead or unknown handle
    /// - [`Error::Transport`] if the engine rejects the frame
    pub fn ws_send(&mut self, socket: SocketId, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let record = self
            .sockets
            .get(socket.get())
            .ok_or(Error::socket_not_found(socket))?;
        self.engine.send_frame(record.native, opcode, payload)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Client {
    /// Returns the socket's lifecycle state.
    ///
    /// # Errors
    ///
    /// [`Error::SocketNotFound`] for a dead or unknown handle.
    pub fn ws_state(&self, socket: SocketId) -> Result<SocketState> {
        self.sockets
            .get(socket.get())
            .map(|record| record.state)
            .ok_or(Error::socket_not_found(socket))
    }

    /// Fetches a received message by handle.
    ///
    /// Messages live for exactly one cycle after delivery: a message
    /// announced during one `update` call is gone at the start of the next.
    /// Returns `None` for a message that was never delivered or has already
    /// been dropped.
    ///
    /// # Errors
    ///
    /// [`Error::SocketNotFound`] for a dead or unknown socket handle.
    pub fn ws_message(&self, socket: SocketId, message: MessageId) -> Result<Option<&Message>> {
        self.sockets
            .get(socket.get())
            .map(|record| record.message(message))
            .ok_or(Error::socket_not_found(socket))
    }

    /// Iterates the handles of all live sockets, including disconnected ones
    /// pending garbage collection.
    pub fn ws_ids(&self) -> impl Iterator<Item = SocketId> {
        self.sockets.iter().map(|record| record.id)
    }
}

// ============================================================================
// Tests
// ============================================================================
