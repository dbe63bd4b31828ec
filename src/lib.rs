//! # baps-gateway
//!
//! Protocol engine for the BAPS radio playout server.
//!
//! BAPS speaks a binary TCP protocol: every message is a 16-bit command word
//! (main code plus 4-bit subcode), a 32-bit byte count, and a sequence of
//! big-endian integers, floats and length-prefixed strings. Messages carry no
//! reliable framing, so the client decodes them field by field using a table
//! of known response layouts.
//!
//! ## Architecture
//!
//! - **Protocol** (no I/O): demand reader, primitive codec, code table,
//!   response structures, decoder, request builder
//! - **Session**: binary mode, seed, login, synchronise
//! - **Client**: socket read loop, outbound queue, handler dispatch
//!
//! ## Example
//!
//! ```ignore
//! use baps_gateway::protocol::{Code, codes::playback};
//! use baps_gateway::ClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> baps_gateway::Result<()> {
//!     let client = ClientBuilder::new()
//!         .credentials("studio1", "secret")
//!         .handle(Code::Wire(playback::LOAD), |response, _requester| async move {
//!             tracing::info!(channel = response.subcode, title = ?response.get_string("title"));
//!             Ok(())
//!         })
//!         .connect("127.0.0.1", 1350)
//!         .await?;
//!
//!     client.wait_for_shutdown().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod output;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod transport;
pub mod writer;

mod client;

pub use client::{Client, ClientBuilder};
pub use error::{GatewayError, Result};
pub use handler::{Requester, ResponderRegistry};
