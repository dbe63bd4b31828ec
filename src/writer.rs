//! Outbound request queue and dedicated writer task.
//!
//! Requests are encoded by the caller and handed to a writer task over an
//! mpsc channel. The task owns the socket write half and writes one request
//! at a time, popping the next only after the previous write returns.
//!
//! # Architecture
//!
//! ```text
//! Handshake ─┐
//! Requester ─┼─► mpsc::Sender<OutboundRequest> ─► Writer Task ─► Socket
//! Handlers  ─┘
//! ```
//!
//! Writes are not paced by responses: the server pushes many responses
//! unprompted, so nothing here waits for a reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::{GatewayError, Result};
use crate::protocol::{Code, Request};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A request ready to be written to the socket.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// Code word, kept for logging.
    pub code: u16,
    /// Encoded request (command word + fields).
    pub bytes: Bytes,
}

impl OutboundRequest {
    /// Encode a request for sending.
    pub fn new(request: &Request) -> Self {
        Self {
            code: request.code(),
            bytes: request.encode(),
        }
    }

    /// Total size of this request on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl From<&Request> for OutboundRequest {
    fn from(request: &Request) -> Self {
        Self::new(request)
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the request queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for queueing requests to the writer task.
///
/// This is cheaply cloneable and can be shared across handlers.
#[derive(Clone)]
pub struct WriterHandle {
    /// Channel sender for requests.
    tx: mpsc::Sender<OutboundRequest>,
    /// Requests queued but not yet written.
    pending: Arc<AtomicUsize>,
}

impl WriterHandle {
    fn new(tx: mpsc::Sender<OutboundRequest>, pending: Arc<AtomicUsize>) -> Self {
        Self { tx, pending }
    }

    /// Queue a request, waiting for channel space if the queue is full.
    pub async fn send(&self, request: &Request) -> Result<()> {
        self.send_encoded(OutboundRequest::new(request)).await
    }

    /// Queue an already-encoded request.
    ///
    /// The pending count only moves once a queue slot is reserved, so a
    /// cancelled call leaves it untouched.
    pub async fn send_encoded(&self, outbound: OutboundRequest) -> Result<()> {
        tracing::debug!(
            code = %Code::Wire(outbound.code),
            size = outbound.size(),
            "queue request"
        );

        let permit = self
            .tx
            .reserve()
            .await
            .map_err(|_| GatewayError::ConnectionClosed)?;

        self.pending.fetch_add(1, Ordering::AcqRel);
        permit.send(outbound);
        Ok(())
    }

    /// Queue a request without waiting.
    ///
    /// Fails with `QueueFull` when the queue is at capacity and with
    /// `ConnectionClosed` when the writer is gone.
    pub fn try_send(&self, request: &Request) -> Result<()> {
        let permit = self.tx.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => GatewayError::QueueFull,
            TrySendError::Closed(()) => GatewayError::ConnectionClosed,
        })?;

        self.pending.fetch_add(1, Ordering::AcqRel);
        permit.send(OutboundRequest::new(request));
        Ok(())
    }

    /// Get current pending request count.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for queueing requests.
///
/// # Returns
///
/// A tuple of `(WriterHandle, JoinHandle)` where the JoinHandle can be used
/// to wait for the writer task to complete. The task ends cleanly once every
/// handle is dropped and the queue is drained.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle::new(tx, pending.clone());
    let task = tokio::spawn(writer_loop(rx, writer, pending));

    (handle, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

/// Main writer loop - pops requests in order and writes each one fully.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<OutboundRequest>,
    mut writer: W,
    pending: Arc<AtomicUsize>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(outbound) = rx.recv().await {
        writer.write_all(&outbound.bytes).await?;
        writer.flush().await?;
        pending.fetch_sub(1, Ordering::Release);

        tracing::trace!(code = %Code::Wire(outbound.code), "request written");
    }

    // Channel closed, clean shutdown
    writer.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes::{playback, system};
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_outbound_request_creation() {
        let request = Request::new(playback::POSITION, 1).uint32(5);
        let outbound = OutboundRequest::new(&request);

        assert_eq!(outbound.code, playback::POSITION);
        assert_eq!(outbound.size(), 6 + 4);
        assert_eq!(outbound.bytes, request.encode());
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[tokio::test]
    async fn test_writer_handle_send() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task_default(client);

        let request = Request::new(system::SET_BINARY_MODE, 0);
        handle.send(&request).await.unwrap();

        let mut buf = vec![0u8; 6];
        server.read_exact(&mut buf).await.unwrap();

        assert_eq!(buf, request.encode().to_vec());
    }

    #[tokio::test]
    async fn test_writes_preserve_queue_order() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task_default(client);

        let mut expected = Vec::new();
        for i in 0..10u32 {
            let request = Request::new(playback::POSITION, 0).uint32(i);
            expected.extend_from_slice(&request.encode());
            handle.send(&request).await.unwrap();
        }

        let mut buf = vec![0u8; expected.len()];
        server.read_exact(&mut buf).await.unwrap();

        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_pending_count_drains() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task_default(client);

        handle
            .send(&Request::new(playback::PLAY, 0))
            .await
            .unwrap();

        let mut buf = vec![0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_try_send_after_writer_gone() {
        let (tx, rx) = mpsc::channel::<OutboundRequest>(10);
        drop(rx);
        let handle = WriterHandle::new(tx, Arc::new(AtomicUsize::new(0)));

        let result = handle.try_send(&Request::new(playback::STOP, 0));

        assert!(matches!(result, Err(GatewayError::ConnectionClosed)));
        assert_eq!(handle.pending_count(), 0);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_try_send_full_queue_is_not_closed() {
        let (tx, _rx) = mpsc::channel::<OutboundRequest>(1);
        let handle = WriterHandle::new(tx, Arc::new(AtomicUsize::new(0)));

        handle.try_send(&Request::new(playback::PLAY, 0)).unwrap();
        let result = handle.try_send(&Request::new(playback::PLAY, 1));

        assert!(matches!(result, Err(GatewayError::QueueFull)));
        assert_eq!(handle.pending_count(), 1);
        assert!(!handle.is_closed());
    }

    #[tokio::test]
    async fn test_cancelled_send_leaves_pending_count() {
        let (tx, _rx) = mpsc::channel::<OutboundRequest>(1);
        let handle = WriterHandle::new(tx, Arc::new(AtomicUsize::new(0)));

        handle.send(&Request::new(playback::PLAY, 0)).await.unwrap();

        // Queue is full, so this send waits until the timeout drops it
        let blocked = tokio::time::timeout(
            Duration::from_millis(20),
            handle.send(&Request::new(playback::STOP, 0)),
        )
        .await;

        assert!(blocked.is_err());
        assert_eq!(handle.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_writer_loop_into_cursor() {
        let (tx, rx) = mpsc::channel(4);
        let pending = Arc::new(AtomicUsize::new(2));

        tx.send(OutboundRequest::new(&Request::new(playback::PLAY, 1)))
            .await
            .unwrap();
        tx.send(OutboundRequest::new(&Request::new(playback::STOP, 1)))
            .await
            .unwrap();
        drop(tx);

        let mut buf = Cursor::new(Vec::new());
        writer_loop(rx, &mut buf, pending.clone()).await.unwrap();

        assert_eq!(buf.into_inner(), vec![0x00, 0x01, 0, 0, 0, 0, 0x00, 0x81, 0, 0, 0, 0]);
        assert_eq!(pending.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, _server) = duplex(4096);
        let (handle, task) = spawn_writer_task_default(client);

        drop(handle);

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }
}
