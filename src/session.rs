//! Login and synchronise handshake.
//!
//! The server will not accept ordinary traffic until the client has:
//!
//! 1. switched the connection to binary mode,
//! 2. answered the seed challenge with a LOGIN carrying the credential hash,
//! 3. received an OK login result and asked to synchronise.
//!
//! [`Handshake`] is a sans-I/O state machine: it is fed decoded responses
//! and answers with the action the connection should take.
//!
//! # Example
//!
//! ```
//! use baps_gateway::protocol::{codes::system, Code, Response, Value};
//! use baps_gateway::session::{Handshake, HandshakeAction, SessionState};
//!
//! let mut handshake = Handshake::new("user", "password");
//! let _binary_mode = handshake.start();
//! assert_eq!(handshake.state(), SessionState::AwaitingSeed);
//!
//! let seed = Response::new(Code::Wire(system::SEED), 0, "SEED")
//!     .with("seed", Value::Str("abc123".into()));
//! assert!(matches!(handshake.on_response(&seed), HandshakeAction::Send(_)));
//! assert_eq!(handshake.state(), SessionState::AwaitingLoginResult);
//! ```

use std::fmt;

use md5::{Digest, Md5};
use serde::Serialize;

use crate::protocol::codes::{login_result, sync, system};
use crate::protocol::{Code, Request, Response};

/// Where the handshake is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Binary mode not yet requested.
    Disconnected,
    /// Binary mode requested; waiting for the seed.
    AwaitingSeed,
    /// LOGIN sent; waiting for the result.
    AwaitingLoginResult,
    /// Logged in and subscribed. Responses go to the responder.
    Synchronised,
    /// Login rejected. The connection should be closed.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::AwaitingSeed => "awaiting_seed",
            SessionState::AwaitingLoginResult => "awaiting_login_result",
            SessionState::Synchronised => "synchronised",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the connection should do after a response.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeAction {
    /// Queue this request.
    Send(Request),
    /// Login failed: report and close deliberately.
    Close {
        /// Login result name.
        status: &'static str,
        /// Detail string from the server.
        details: String,
    },
    /// Handshake is done; hand the response to the responder.
    Forward,
    /// Nothing to do.
    Ignore,
}

/// Login handshake state machine.
#[derive(Debug, Clone)]
pub struct Handshake {
    username: String,
    password: String,
    state: SessionState,
}

impl Handshake {
    /// Create a handshake for the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            state: SessionState::Disconnected,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether ordinary traffic may flow.
    #[inline]
    pub fn is_synchronised(&self) -> bool {
        self.state == SessionState::Synchronised
    }

    /// Username this handshake logs in as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Begin the handshake: returns the binary mode request to send.
    pub fn start(&mut self) -> Request {
        self.transition(SessionState::AwaitingSeed);
        Request::new(system::SET_BINARY_MODE, 0)
    }

    /// Feed one decoded response.
    pub fn on_response(&mut self, response: &Response) -> HandshakeAction {
        if response.is_banner() {
            tracing::info!(
                banner = %response.get_string("message").unwrap_or_default(),
                "server banner"
            );
            return HandshakeAction::Ignore;
        }

        match (self.state, response.code) {
            (SessionState::Synchronised, _) => HandshakeAction::Forward,
            (SessionState::AwaitingSeed, Code::Wire(system::SEED)) => self.on_seed(response),
            (SessionState::AwaitingLoginResult, Code::Wire(system::LOGIN_RESULT)) => {
                self.on_login_result(response)
            }
            (state, code) => {
                tracing::debug!(%state, %code, "response ignored during handshake");
                HandshakeAction::Ignore
            }
        }
    }

    /// Connection went away.
    pub fn on_disconnect(&mut self) {
        if self.state != SessionState::Failed {
            self.transition(SessionState::Disconnected);
        }
    }

    fn on_seed(&mut self, response: &Response) -> HandshakeAction {
        let seed = response.get_bytes("seed").cloned().unwrap_or_default();
        let hash = credential_hash(&seed, &self.password);

        self.transition(SessionState::AwaitingLoginResult);
        HandshakeAction::Send(
            Request::new(system::LOGIN, 0)
                .string(&self.username)
                .string(hash),
        )
    }

    fn on_login_result(&mut self, response: &Response) -> HandshakeAction {
        if response.subcode == login_result::OK {
            self.transition(SessionState::Synchronised);
            return HandshakeAction::Send(Request::new(system::SYNC, sync::SUBSCRIBE));
        }

        self.transition(SessionState::Failed);
        HandshakeAction::Close {
            status: login_result::name(response.subcode),
            details: response.get_string("details").unwrap_or_default(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!(from = %self.state, to = %next, "session state");
        self.state = next;
    }
}

/// Hash sent in LOGIN: `md5(seed ++ md5(password))`, both as lowercase hex.
pub fn credential_hash(seed: &[u8], password: &str) -> String {
    let inner = format!("{:x}", Md5::digest(password.as_bytes()));

    let mut hasher = Md5::new();
    hasher.update(seed);
    hasher.update(inner.as_bytes());
    format!("{:x}", hasher.finalize())
}
