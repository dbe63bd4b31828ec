//! Handler module - response dispatch once the session is synchronised.
//!
//! Provides:
//! - [`ResponderRegistry`] - maps response codes to handlers
//! - [`Requester`] - lets handlers queue requests back to the server
//!
//! # Example
//!
//! ```ignore
//! use baps_gateway::handler::ResponderRegistry;
//! use baps_gateway::protocol::{Code, codes::playlist};
//!
//! let mut registry = ResponderRegistry::new();
//!
//! // Ask for every item when the playlist size is announced
//! registry.register(Code::Wire(playlist::ITEM_COUNT), |response, requester| async move {
//!     let count = response.get_u32("count").unwrap_or(0);
//!     for index in 0..count {
//!         let request = requester.build(playlist::ITEM_DATA, response.subcode).uint32(index);
//!         requester.send(&request).await?;
//!     }
//!     Ok(())
//! });
//! ```

mod context;
mod registry;

pub use context::Requester;
pub use registry::{BoxFuture, FnHandler, Handler, HandlerResult, ResponderRegistry};
