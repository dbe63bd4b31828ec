//! Transport module - TCP socket handling.
//!
//! Provides the single downstream connection to the BAPS server.

mod tcp;

pub use tcp::{connect, BapsStream, DEFAULT_PORT};
