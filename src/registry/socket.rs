//! WebSocket records and their message queues.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::identifiers::{MessageId, RawHandle, SocketId};
use crate::protocol::Opcode;
use crate::transport::NativeHandle;

use super::Keyed;

// ============================================================================
// SocketState
// ============================================================================

/// Lifecycle state of a WebSocket connection.
///
/// Moves strictly forward: `New → Connected → Disconnected`, never backward.
/// Disconnected records linger one cycle so final received messages can
/// still be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Connect requested; handshake not yet announced.
    New,
    /// Safe to send; announced via the connect callback.
    Connected,
    /// The transport reported completion; lingering until the next cycle.
    Disconnected,
}

// ============================================================================
// Message
// ============================================================================

/// One received WebSocket message.
///
/// Owned by its connection; destroyed en masse at the start of the cycle
/// after the one that delivered it.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    opcode: Opcode,
    payload: Vec<u8>,
}

impl Message {
    /// Returns the message handle.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the frame kind.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

// ============================================================================
// SocketRecord
// ============================================================================

/// Bookkeeping record of one WebSocket connection.
#[derive(Debug)]
pub(crate) struct SocketRecord {
    /// Caller-visible handle, immutable.
    pub(crate) id: SocketId,
    /// The transport engine's handle for this connection.
    pub(crate) native: NativeHandle,
    /// Forward-only lifecycle state.
    pub(crate) state: SocketState,
    /// End-of-headers observed; the Connected transition is delayed until
    /// the next cycle because sends are unreliable immediately after the
    /// handshake completes.
    pub(crate) headers_done: bool,
    /// Messages received since the last cycle started.
    pub(crate) messages: Vec<Message>,
    /// Set once the disconnect callback was reported; the record is
    /// destroyed on the next cycle's GC pass.
    pub(crate) finished: bool,
}

impl SocketRecord {
    /// Creates a record in the `New` state.
    pub(crate) fn new(id: SocketId, native: NativeHandle) -> Self {
        Self {
            id,
            native,
            state: SocketState::New,
            headers_done: false,
            messages: Vec::new(),
            finished: false,
        }
    }

    /// Enqueues a received message.
    ///
    /// The payload is copied; `limit` caps its size.
    ///
    /// # Errors
    ///
    /// - [`Error::LimitExceeded`] if the payload is over the limit
    /// - [`Error::OutOfMemory`] if an allocation fails
    pub(crate) fn push_message(
        &mut self,
        id: MessageId,
        opcode: Opcode,
        payload: &[u8],
        limit: Option<usize>,
    ) -> Result<()> {
        if let Some(limit) = limit
            && payload.len() > limit
        {
            return Err(Error::limit_exceeded(payload.len(), limit));
        }
        let mut copy = Vec::new();
        copy.try_reserve_exact(payload.len())?;
        copy.extend_from_slice(payload);
        self.messages.try_reserve(1)?;
        self.messages.push(Message {
            id,
            opcode,
            payload: copy,
        });
        Ok(())
    }

    /// Fetches a message by handle.
    pub(crate) fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Drops all queued messages; they have had their chance to be fetched.
    pub(crate) fn clear_messages(&mut self) {
        self.messages.clear();
    }
}

impl Keyed for SocketRecord {
    fn key(&self) -> RawHandle {
        self.id.get()
    }
}

// ============================================================================
// Tests
// ============================================================================
