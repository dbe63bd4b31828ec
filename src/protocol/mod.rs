//! Protocol module - BAPS wire format, decoding, and request encoding.
//!
//! This module is free of I/O:
//! - Demand reader for satisfying byte-count requests from partial reads
//! - Big-endian primitive codec and the command word
//! - Code table and response structure table
//! - Response decoder and request builder

pub mod codes;
mod decoder;
mod demand_reader;
pub mod primitive;
mod request;
mod response;
pub mod structure;

pub use codes::Code;
pub use decoder::{ParseState, ResponseDecoder};
pub use demand_reader::{Continuation, DemandReader, Priority};
pub use request::{Field, Request};
pub use response::{Response, Value};
pub use structure::{FieldKind, FieldSpec};
