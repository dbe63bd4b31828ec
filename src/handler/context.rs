//! Requester handed to response handlers.
//!
//! Lets a handler put requests on the outbound queue:
//! - `build` - start a request for a code and subcode
//! - `send` - queue a request, waiting for queue space
//! - `try_send` - queue a request without waiting
//!
//! # Example
//!
//! ```ignore
//! async fn on_item_count(response: Response, requester: Requester) -> Result<()> {
//!     let count = response.get_u32("count").unwrap_or(0);
//!     for index in 0..count {
//!         requester
//!             .send(&requester.build(playlist::ITEM_DATA, response.subcode).uint32(index))
//!             .await?;
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::protocol::Request;
use crate::writer::WriterHandle;

/// Handle through which handlers reach the wire.
///
/// `Requester` is `Clone` and can be shared across tasks; all clones feed the
/// same outbound queue, so requests keep the order they were sent in.
#[derive(Clone, Default)]
pub struct Requester {
    /// Writer handle for the outbound queue.
    writer: Option<WriterHandle>,
}

impl Requester {
    /// Create a requester with no writer (requests are dropped).
    pub fn detached() -> Self {
        Self { writer: None }
    }

    /// Create a requester feeding the given writer.
    pub fn with_writer(writer: WriterHandle) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Start a request. Append fields with the builder methods on [`Request`].
    pub fn build(&self, code: u16, subcode: u8) -> Request {
        Request::new(code, subcode)
    }

    /// Queue a request.
    pub async fn send(&self, request: &Request) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.send(request).await,
            None => {
                tracing::trace!(code = request.code(), "no writer, request dropped");
                Ok(())
            }
        }
    }

    /// Queue a request without waiting for queue space.
    ///
    /// A full queue yields `QueueFull`, which the session logs and survives.
    pub fn try_send(&self, request: &Request) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.try_send(request),
            None => Ok(()),
        }
    }

    /// Requests queued but not yet written.
    pub fn pending_count(&self) -> usize {
        self.writer.as_ref().map_or(0, WriterHandle::pending_count)
    }

    /// Whether this requester reaches a live writer.
    pub fn is_attached(&self) -> bool {
        self.writer.as_ref().is_some_and(|w| !w.is_closed())
    }
}
