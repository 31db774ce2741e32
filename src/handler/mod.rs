//! Handler module - name-indexed handler storage and lookup.
//!
//! Provides:
//! - [`Handler`] - a function from [`CallRequest`](crate::CallRequest) to
//!   [`CallResponse`](crate::CallResponse)
//! - [`HandlerRegistry`] - maps function names to handlers

mod registry;

pub use registry::{Handler, HandlerError, HandlerRegistry, HandlerResult};
