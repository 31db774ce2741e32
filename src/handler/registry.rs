//! Handler registry for dispatching calls by function name.
//!
//! The registry maps function names to handlers. Registering a name twice
//! replaces the earlier handler. Once a [`Server`](crate::Server) is bound
//! the registry is frozen behind an `Arc` and only read.
//!
//! # Example
//!
//! ```
//! use callwire::handler::HandlerRegistry;
//! use callwire::{CallRequest, CallResponse};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("SayHello", |_req: &CallRequest| Ok(CallResponse::ok("I'm Rust")));
//!
//! let response = registry.dispatch(&CallRequest::without_argument("SayHello")).unwrap();
//! assert_eq!(response.result(), b"I'm Rust");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::message::{CallRequest, CallResponse};

/// Error raised by a handler while producing a response.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<CallResponse, HandlerError>;

/// A function callable by name.
///
/// Handlers run on a blocking worker thread and may block for as long as
/// they need; a slow handler only holds its own worker slot.
pub trait Handler: Send + Sync + 'static {
    /// Produce the response for `request`.
    fn call(&self, request: &CallRequest) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&CallRequest) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, request: &CallRequest) -> HandlerResult {
        self(request)
    }
}

/// Registry mapping function names to handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure under `name`, replacing any previous handler.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&CallRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(name, handler);
    }

    /// Register `handler` under `name`, replacing any previous handler.
    ///
    /// An empty name can never be called, so it is ignored with a warning.
    pub fn register_handler<H: Handler>(&mut self, name: &str, handler: H) {
        if name.is_empty() {
            tracing::warn!("Ignoring handler registered under an empty function name");
            return;
        }
        if self
            .handlers
            .insert(name.to_string(), Arc::new(handler))
            .is_some()
        {
            tracing::debug!(function = name, "Replaced existing handler");
        }
    }

    /// Remove the handler registered under `name`.
    ///
    /// Returns whether a handler was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Look up the handler registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve and invoke in the current thread.
    ///
    /// An unregistered name yields [`CallResponse::unknown`] without
    /// touching any handler. A registered handler's result is returned
    /// unchanged, including its errors.
    pub fn dispatch(&self, request: &CallRequest) -> HandlerResult {
        match self.handlers.get(request.function_name()) {
            Some(handler) => handler.call(request),
            None => Ok(CallResponse::unknown()),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reply(text: &'static str) -> impl Fn(&CallRequest) -> HandlerResult + Send + Sync + 'static {
        move |_req: &CallRequest| Ok(CallResponse::ok(text))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", |req: &CallRequest| {
            Ok(CallResponse::ok(req.argument().to_vec()))
        });

        assert!(registry.contains("echo"));
        assert_eq!(registry.len(), 1);

        let handler = registry.resolve("echo").unwrap();
        let response = handler.call(&CallRequest::new("echo", "abc")).unwrap();
        assert_eq!(response, CallResponse::ok("abc"));
    }

    #[test]
    fn test_resolve_missing() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("nonexistent").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = HandlerRegistry::new();
        registry.register("SayHello", reply("hi"));

        assert!(registry.resolve("sayhello").is_none());
        assert!(registry.resolve("SayHello ").is_none());
        assert!(registry.resolve("SayHello").is_some());
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register("greet", reply("first"));
        registry.register("greet", reply("second"));

        assert_eq!(registry.len(), 1);
        let response = registry
            .dispatch(&CallRequest::without_argument("greet"))
            .unwrap();
        assert_eq!(response.result(), b"second");
    }

    #[test]
    fn test_empty_name_is_ignored() {
        let mut registry = HandlerRegistry::new();
        registry.register("", reply("never"));

        assert!(registry.is_empty());
        let response = registry.dispatch(&CallRequest::without_argument("")).unwrap();
        assert!(response.is_unknown());
    }

    #[test]
    fn test_unregister() {
        let mut registry = HandlerRegistry::new();
        registry.register("temp", reply("x"));

        assert!(registry.unregister("temp"));
        assert!(!registry.unregister("temp"));
        assert!(!registry.contains("temp"));
    }

    #[test]
    fn test_dispatch_unknown_never_invokes_neighbour() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut registry = HandlerRegistry::new();
        registry.register("SayHello", move |_req: &CallRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(CallResponse::ok("hello"))
        });

        let response = registry
            .dispatch(&CallRequest::without_argument("SayHello2"))
            .unwrap();

        assert_eq!(response, CallResponse::unknown());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_passes_handler_error_through() {
        let mut registry = HandlerRegistry::new();
        registry.register("fail", |_req: &CallRequest| Err("disk on fire".into()));

        let err = registry
            .dispatch(&CallRequest::without_argument("fail"))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = HandlerRegistry::new();
        registry.register("b", reply("b"));
        registry.register("a", reply("a"));

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(
            format!("{:?}", registry),
            r#"HandlerRegistry { functions: ["a", "b"] }"#
        );
    }
}
