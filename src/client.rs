//! Client builder and runtime loop.
//!
//! The [`ClientBuilder`] collects credentials and response handlers. The
//! [`Client`] manages the connection lifecycle:
//! 1. Connect to the server
//! 2. Spawn the writer task and request binary mode
//! 3. Read bytes, decode responses, drive the handshake
//! 4. Once synchronised, dispatch responses to handlers
//!
//! Any disconnect that was not asked for is fatal: the protocol has no
//! resume, so the client stops with [`GatewayError::ConnectionLost`].
//!
//! # Example
//!
//! ```ignore
//! use baps_gateway::protocol::{Code, codes::playback};
//! use baps_gateway::Client;
//!
//! #[tokio::main]
//! async fn main() -> baps_gateway::Result<()> {
//!     let client = Client::builder()
//!         .credentials("studio1", "secret")
//!         .handle(Code::Wire(playback::POSITION), |response, _requester| async move {
//!             let position = response.get_u32("position");
//!             tracing::info!(channel = response.subcode, ?position);
//!             Ok(())
//!         })
//!         .connect("127.0.0.1", 1350)
//!         .await?;
//!
//!     client.wait_for_shutdown().await
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::error::{GatewayError, Result};
use crate::handler::{HandlerResult, Requester, ResponderRegistry};
use crate::output::write_response_json;
use crate::protocol::{Code, Request, Response, ResponseDecoder};
use crate::session::{Handshake, HandshakeAction, SessionState};
use crate::transport::BapsStream;
use crate::writer::{spawn_writer_task, WriterConfig, WriterHandle};

/// Socket read buffer size.
pub const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Builder for configuring and creating a BAPS client.
pub struct ClientBuilder {
    registry: ResponderRegistry,
    writer_config: WriterConfig,
    username: String,
    password: String,
    json_output: bool,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            registry: ResponderRegistry::new(),
            writer_config: WriterConfig::default(),
            username: String::new(),
            password: String::new(),
            json_output: false,
        }
    }

    /// Set the login credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Register a handler for responses with the given code.
    ///
    /// Handlers only see responses that arrive after synchronisation.
    pub fn handle<F, Fut>(mut self, code: Code, handler: F) -> Self
    where
        F: Fn(Response, Requester) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(code, handler);
        self
    }

    /// Use a prepared registry, replacing any handlers registered so far.
    pub fn registry(mut self, registry: ResponderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the outbound queue capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.writer_config.channel_capacity = capacity;
        self
    }

    /// Write every response received after synchronisation to stdout as a JSON line.
    pub fn json_output(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }

    /// Connect to `host:port` and start the client.
    pub async fn connect(self, host: &str, port: u16) -> Result<Client> {
        let stream = BapsStream::connect(host, port).await?;
        let (reader, writer) = stream.into_split();
        self.start(reader, writer).await
    }

    /// Start the client over an already-open byte stream.
    ///
    /// This will:
    /// 1. Spawn the writer task
    /// 2. Queue the binary mode request
    /// 3. Spawn the read loop
    pub async fn start<R, W>(self, reader: R, writer: W) -> Result<Client>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Client::start(self, reader, writer).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running BAPS client.
///
/// Use `requester()` to send requests once synchronised.
/// Use `wait_for_shutdown()` or `close()` to end the session.
pub struct Client {
    /// Writer handle for queueing requests.
    writer: WriterHandle,
    /// Handshake state as seen by the read loop.
    state_rx: watch::Receiver<SessionState>,
    /// Deliberate close signal for the read loop.
    close_tx: Option<oneshot::Sender<()>>,
    /// Read loop task handle.
    read_task: JoinHandle<Result<()>>,
    /// Writer task handle.
    writer_task: JoinHandle<Result<()>>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    async fn start<R, W>(builder: ClientBuilder, reader: R, write_half: W) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer, writer_task) = spawn_writer_task(write_half, builder.writer_config);

        let mut handshake = Handshake::new(builder.username, builder.password);
        writer.send(&handshake.start()).await?;

        let (state_tx, state_rx) = watch::channel(handshake.state());
        let (close_tx, close_rx) = oneshot::channel();

        let session = Session {
            handshake,
            registry: Arc::new(builder.registry),
            requester: Requester::with_writer(writer.clone()),
            state_tx,
            json_output: builder.json_output,
        };

        let read_task = tokio::spawn(read_loop(reader, session, close_rx));

        Ok(Client {
            writer,
            state_rx,
            close_tx: Some(close_tx),
            read_task,
            writer_task,
        })
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Wait until the handshake reaches `target` or fails.
    ///
    /// Returns the state that ended the wait.
    pub async fn wait_for_state(&mut self, target: SessionState) -> Result<SessionState> {
        let state = self
            .state_rx
            .wait_for(|state| *state == target || *state == SessionState::Failed)
            .await
            .map_err(|_| GatewayError::ConnectionClosed)?;
        Ok(*state)
    }

    /// A requester for queueing requests from outside a handler.
    pub fn requester(&self) -> Requester {
        Requester::with_writer(self.writer.clone())
    }

    /// Queue a request.
    pub async fn send(&self, request: &Request) -> Result<()> {
        self.writer.send(request).await
    }

    /// Requests queued but not yet written.
    pub fn pending_requests(&self) -> usize {
        self.writer.pending_count()
    }

    /// Close the connection deliberately.
    ///
    /// Requests already queued are written before the socket is shut down.
    pub async fn close(mut self) -> Result<()> {
        self.signal_close();
        let result = join(&mut self.read_task).await;
        self.finish(result).await
    }

    /// Run until the session ends or `signal` fires, closing on the signal.
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let ended = tokio::select! {
            joined = &mut self.read_task => Some(flatten(joined)),
            _ = signal => None,
        };

        let result = match ended {
            Some(result) => result,
            None => {
                tracing::info!("shutdown requested");
                self.signal_close();
                join(&mut self.read_task).await
            }
        };
        self.finish(result).await
    }

    /// Wait for the session to end.
    ///
    /// Returns `Ok` after a deliberate close, and the fatal error otherwise
    /// (connection lost, protocol error, authentication failure).
    pub async fn wait_for_shutdown(mut self) -> Result<()> {
        let result = join(&mut self.read_task).await;
        self.finish(result).await
    }

    fn signal_close(&mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
    }

    async fn finish(self, result: Result<()>) -> Result<()> {
        let Client {
            writer,
            close_tx,
            mut writer_task,
            ..
        } = self;

        // Dropping the last handle lets the writer drain and shut down
        drop(close_tx);
        drop(writer);
        let write_result = join(&mut writer_task).await;

        // A peer that already hung up makes the final shutdown fail
        result.and(write_result.or_else(|e| match e {
            GatewayError::Io(_) => Ok(()),
            other => Err(other),
        }))
    }
}

async fn join(task: &mut JoinHandle<Result<()>>) -> Result<()> {
    flatten(task.await)
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| GatewayError::Io(std::io::Error::other(e)))?
}

/// Read-side state owned by the read loop.
struct Session {
    handshake: Handshake,
    registry: Arc<ResponderRegistry>,
    requester: Requester,
    state_tx: watch::Sender<SessionState>,
    json_output: bool,
}

impl Session {
    async fn handle(&mut self, response: Response) -> Result<()> {
        let action = self.handshake.on_response(&response);
        self.publish_state();

        match action {
            HandshakeAction::Send(request) => self.requester.send(&request).await,
            HandshakeAction::Close { status, details } => {
                tracing::error!(status, %details, "authentication failed");
                Err(GatewayError::AuthenticationFailed { status, details })
            }
            HandshakeAction::Forward => {
                if self.json_output {
                    write_response_json(&response)?;
                }
                let code = response.code;
                match self
                    .registry
                    .dispatch(response, self.requester.clone())
                    .await
                {
                    Err(GatewayError::ConnectionClosed) => Err(GatewayError::ConnectionClosed),
                    Err(e) => {
                        tracing::error!(%code, error = %e, "handler error");
                        Ok(())
                    }
                    Ok(()) => Ok(()),
                }
            }
            HandshakeAction::Ignore => Ok(()),
        }
    }

    fn disconnected(&mut self) {
        self.handshake.on_disconnect();
        self.publish_state();
    }

    fn publish_state(&self) {
        self.state_tx.send_if_modified(|state| {
            let next = self.handshake.state();
            let changed = *state != next;
            *state = next;
            changed
        });
    }
}

/// Main read loop - reads bytes, decodes responses, hands them on.
async fn read_loop<R>(
    mut reader: R,
    mut session: Session,
    mut close_rx: oneshot::Receiver<()>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = ResponseDecoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(n) => n,
                Err(e) => {
                    session.disconnected();
                    tracing::error!(error = %e, "connection lost");
                    return Err(GatewayError::ConnectionLost);
                }
            },
            _ = &mut close_rx => {
                tracing::debug!("connection closed by request");
                session.disconnected();
                return Ok(());
            }
        };

        if n == 0 {
            session.disconnected();
            tracing::error!("connection lost");
            return Err(GatewayError::ConnectionLost);
        }

        let responses = match decoder.push(&buf[..n]) {
            Ok(responses) => responses,
            Err(e) => {
                for response in decoder.take_completed() {
                    session.handle(response).await?;
                }
                report_protocol_error(&e);
                return Err(e);
            }
        };

        for response in responses {
            session.handle(response).await?;
        }
    }
}

fn report_protocol_error(error: &GatewayError) {
    match error {
        GatewayError::UnknownCode { code, subcode } => {
            tracing::error!(
                code = %Code::Wire(*code),
                subcode,
                "no structure for response code, stream alignment lost"
            );
        }
        other => tracing::error!(error = %other, "protocol error"),
    }
}
