//! Demand reader for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Consumers do not
//! pull whole frames; they queue "give me N bytes, then run this" requests and
//! the reader satisfies them as socket data arrives:
//! - each request is satisfied exactly once, with exactly N bytes
//! - requests are serviced in FIFO order
//! - `Priority::Immediate` requests jump to the front of the queue
//!
//! # Example
//!
//! ```
//! use baps_gateway::protocol::{DemandReader, Priority};
//!
//! let mut reader: DemandReader<Vec<u8>> = DemandReader::new();
//! let mut seen = Vec::new();
//!
//! reader.request(3, Priority::Normal, |_, seen: &mut Vec<u8>, bytes| {
//!     seen.extend_from_slice(&bytes);
//!     Ok(())
//! });
//!
//! reader.add_data(&mut seen, b"ab").unwrap();
//! assert!(seen.is_empty());
//! reader.add_data(&mut seen, b"c").unwrap();
//! assert_eq!(seen, b"abc");
//! ```

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::error::{GatewayError, Result};

/// Where a new request lands in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Appended to the back of the queue.
    Normal,
    /// Inserted at the front, ahead of everything already queued.
    Immediate,
}

/// Continuation run once a request's bytes are available.
///
/// Receives the reader itself so it can queue follow-up requests, the
/// caller-supplied context, and exactly the requested bytes.
pub type Continuation<C> =
    Box<dyn FnOnce(&mut DemandReader<C>, &mut C, Bytes) -> Result<()> + Send>;

/// An outstanding request for bytes.
struct PendingRead<C> {
    byte_count: usize,
    continuation: Continuation<C>,
}

/// Buffer for accumulating incoming bytes and satisfying byte-count requests.
///
/// `C` is the context handed to every continuation; the response decoder uses
/// it to carry its parse state.
pub struct DemandReader<C> {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Requests not yet satisfied, head first.
    pending: VecDeque<PendingRead<C>>,
    /// Set while the drain loop runs, so nested calls don't re-enter it.
    draining: bool,
    /// Set once a continuation fails; no further bytes are consumed.
    poisoned: bool,
}

impl<C> DemandReader<C> {
    /// Create a new reader with default capacity (64KB).
    pub fn new() -> Self {
        Self::with_capacity(64 * 1024)
    }

    /// Create a new reader with a custom initial buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            pending: VecDeque::new(),
            draining: false,
            poisoned: false,
        }
    }

    /// Queue a request for `byte_count` bytes.
    ///
    /// The continuation runs once, during some later (or the current)
    /// `add_data` call, when the request is at the head of the queue and the
    /// buffer holds enough bytes.
    pub fn request<F>(&mut self, byte_count: usize, priority: Priority, continuation: F)
    where
        F: FnOnce(&mut DemandReader<C>, &mut C, Bytes) -> Result<()> + Send + 'static,
    {
        let read = PendingRead {
            byte_count,
            continuation: Box::new(continuation),
        };

        match priority {
            Priority::Normal => self.pending.push_back(read),
            Priority::Immediate => self.pending.push_front(read),
        }
    }

    /// Append socket data and satisfy as many pending requests as possible.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a continuation. After that the
    /// reader is poisoned and every later call returns
    /// [`GatewayError::DecoderPoisoned`] without touching the buffer.
    pub fn add_data(&mut self, ctx: &mut C, data: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(GatewayError::DecoderPoisoned);
        }

        self.buffer.extend_from_slice(data);
        self.drain(ctx)
    }

    /// Run the drain loop unless it is already running further up the stack.
    fn drain(&mut self, ctx: &mut C) -> Result<()> {
        if self.draining {
            return Ok(());
        }

        self.draining = true;
        let result = self.drain_ready(ctx);
        self.draining = false;

        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn drain_ready(&mut self, ctx: &mut C) -> Result<()> {
        while let Some(read) = self.pop_ready() {
            let bytes = self.buffer.split_to(read.byte_count).freeze();
            (read.continuation)(self, ctx, bytes)?;
        }
        Ok(())
    }

    /// Pop the head request if the buffer can satisfy it in full.
    fn pop_ready(&mut self) -> Option<PendingRead<C>> {
        match self.pending.front() {
            Some(head) if self.buffer.len() >= head.byte_count => self.pending.pop_front(),
            _ => None,
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of requests waiting for bytes.
    pub fn pending_reads(&self) -> usize {
        self.pending.len()
    }

    /// Whether a continuation has failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Drop buffered bytes and pending requests, clearing any poison.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending.clear();
        self.poisoned = false;
    }
}

impl<C> Default for DemandReader<C> {
    fn default() -> Self {
        Self::new()
    }
}
