//! # callwire
//!
//! Name-indexed RPC dispatch over TCP.
//!
//! A [`Server`] owns a registry of handlers keyed by function name and
//! exposes a single `Call` method. A client sends a [`CallRequest`]
//! (function name + opaque argument); the server resolves the name, runs
//! the handler on a bounded worker pool and returns its [`CallResponse`].
//! Unregistered names get `CallResponse { success: false, result_buffer: "unknown" }`.
//!
//! ## Example
//!
//! ```no_run
//! use callwire::{client, CallRequest, CallResponse, Endpoint, Server};
//!
//! #[tokio::main]
//! async fn main() -> callwire::Result<()> {
//!     let server = Server::builder()
//!         .register("SayHello", |_req: &CallRequest| Ok(CallResponse::ok("I'm Rust")))
//!         .bind(Endpoint::local(9090)?)
//!         .await?;
//!     let handle = server.handle();
//!     tokio::spawn(server.serve());
//!
//!     let endpoint = Endpoint::local(9090)?;
//!     let hello = client::call(&endpoint, CallRequest::without_argument("SayHello")).await?;
//!     assert_eq!(hello.result(), b"I'm Rust");
//!
//!     let bye = client::call(&endpoint, CallRequest::without_argument("SayGoodbye")).await?;
//!     assert!(bye.is_unknown());
//!
//!     handle.shutdown();
//!     handle.stopped().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod server;

mod writer;

pub use client::{Client, ClientConfig};
pub use endpoint::Endpoint;
pub use error::{CallwireError, Result};
pub use handler::{Handler, HandlerError, HandlerRegistry, HandlerResult};
pub use message::{CallRequest, CallResponse, UNKNOWN_FUNCTION};
pub use server::{FailurePolicy, Server, ServerBuilder, ServerConfig, ServerHandle, ServerState};
