//! Growable byte buffers owned by request and socket records.
//!
//! Buffers are append-only during a record's active life. Growth is
//! fallible: an allocation failure or a configured size limit aborts the
//! owning operation instead of leaving silently truncated data behind -
//! partial data is worse than no data for this layer's guarantees.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// ByteBuffer
// ============================================================================

/// Append-only growable byte buffer with an optional size limit.
#[derive(Debug, Default)]
pub(crate) struct ByteBuffer {
    data: Vec<u8>,
    limit: Option<usize>,
}

impl ByteBuffer {
    /// Creates an empty buffer with no size limit.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer capped at `limit` bytes.
    #[inline]
    pub(crate) fn with_limit(limit: Option<usize>) -> Self {
        Self {
            data: Vec::new(),
            limit,
        }
    }

    /// Appends bytes, growing geometrically.
    ///
    /// # Errors
    ///
    /// - [`Error::LimitExceeded`] if the result would pass the size limit
    /// - [`Error::OutOfMemory`] if the allocation fails
    ///
    /// On error the buffer keeps its previous contents; the caller is
    /// expected to abort the owning operation.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let len = self.data.len().saturating_add(bytes.len());
        if let Some(limit) = self.limit
            && len > limit
        {
            return Err(Error::limit_exceeded(len, limit));
        }
        self.data.try_reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the accumulated bytes.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the accumulated length in bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

// ============================================================================
// UploadBuffer
// ============================================================================

/// Request-body bytes with a monotonic read cursor.
///
/// The transport engine pulls upload data in chunks; the cursor tracks how
/// far it has read.
#[derive(Debug, Default)]
pub(crate) struct UploadBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl UploadBuffer {
    /// Creates an upload buffer holding a copy of `body`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the copy cannot be allocated.
    pub(crate) fn new(body: &[u8]) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(body.len())?;
        data.extend_from_slice(body);
        Ok(Self { data, cursor: 0 })
    }

    /// Copies unread bytes into `dst`, advancing the cursor.
    ///
    /// Returns the number of bytes copied; 0 once the body is fully read.
    pub(crate) fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let remaining = &self.data[self.cursor..];
        let n = remaining.len().min(dst.len());
        dst[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        n
    }

    /// Returns the total body length in bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
