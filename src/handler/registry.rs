//! Responder registry for dispatching responses by main code.
//!
//! The registry maps response codes to handlers. Codes with no handler are
//! logged at debug level and otherwise ignored.
//!
//! # Example
//!
//! ```ignore
//! use baps_gateway::handler::ResponderRegistry;
//! use baps_gateway::protocol::{Code, codes::playback};
//!
//! let mut registry = ResponderRegistry::new();
//!
//! registry.register(Code::Wire(playback::POSITION), |response, _requester| async move {
//!     tracing::info!(channel = response.subcode, position = ?response.get_u32("position"));
//!     Ok(())
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::Requester;
use crate::error::Result;
use crate::protocol::{Code, Response};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for response handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle one decoded response.
    fn call(&self, response: Response, requester: Requester) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F> {
    /// Wrap a closure.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Response, Requester) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, response: Response, requester: Requester) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(response, requester))
    }
}

/// Registry mapping response codes to handlers.
pub struct ResponderRegistry {
    handlers: HashMap<Code, Box<dyn Handler>>,
}

impl ResponderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a response code, replacing any earlier one.
    pub fn register<F, Fut>(&mut self, code: Code, handler: F)
    where
        F: Fn(Response, Requester) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(code, FnHandler::new(handler));
    }

    /// Register a handler object.
    pub fn register_handler<H: Handler>(&mut self, code: Code, handler: H) {
        if self.handlers.insert(code, Box::new(handler)).is_some() {
            tracing::debug!(%code, "handler replaced");
        }
    }

    /// Get the handler for a code.
    pub fn get_handler(&self, code: Code) -> Option<&dyn Handler> {
        self.handlers.get(&code).map(|h| h.as_ref())
    }

    /// Whether a handler is registered for `code`.
    pub fn contains(&self, code: Code) -> bool {
        self.handlers.contains_key(&code)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a response to its handler.
    ///
    /// A response whose code has no handler is logged and dropped.
    pub async fn dispatch(&self, response: Response, requester: Requester) -> Result<()> {
        match self.get_handler(response.code) {
            Some(handler) => handler.call(response, requester).await,
            None => {
                tracing::debug!(
                    code = %response.code,
                    subcode = response.subcode,
                    "no handler for response"
                );
                Ok(())
            }
        }
    }
}

impl Default for ResponderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
