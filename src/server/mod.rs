//! Dispatch server: builder, bound server, and shutdown handle.
//!
//! The server lifecycle is `Unbound → Bound → Serving → Stopped`:
//! [`ServerBuilder`] collects handlers, [`ServerBuilder::bind`] validates
//! the configuration and opens the listener, [`Server::serve`] runs the
//! accept loop until [`ServerHandle::shutdown`] is called.
//!
//! # Example
//!
//! ```no_run
//! use callwire::{CallRequest, CallResponse, Endpoint, Server};
//!
//! #[tokio::main]
//! async fn main() -> callwire::Result<()> {
//!     let server = Server::builder()
//!         .register("SayHello", |_req: &CallRequest| Ok(CallResponse::ok("I'm Rust")))
//!         .bind(Endpoint::any(9090)?)
//!         .await?;
//!
//!     let handle = server.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.shutdown();
//!     });
//!
//!     server.serve().await
//! }
//! ```

mod config;
mod connection;
mod dispatch;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

pub use config::{FailurePolicy, ServerConfig, DEFAULT_MAX_CONCURRENT_CALLS};

use self::connection::Connection;
use self::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::error::{CallwireError, Result};
use crate::handler::{Handler, HandlerRegistry, HandlerResult};
use crate::message::CallRequest;

/// Observable lifecycle state of a bound server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Listener open, not yet accepting.
    Bound,
    /// Accept loop running.
    Serving,
    /// Listener released. Terminal.
    Stopped,
}

/// Collects handlers and configuration before the server is bound.
pub struct ServerBuilder {
    registry: HandlerRegistry,
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: ServerConfig::default(),
        }
    }

    /// Register a closure under `name`. A later registration of the same
    /// name replaces this one.
    pub fn register<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&CallRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    /// Register a [`Handler`] implementation under `name`.
    pub fn register_handler<H: Handler>(mut self, name: &str, handler: H) -> Self {
        self.registry.register_handler(name, handler);
        self
    }

    /// Remove a previously registered handler.
    pub fn unregister(mut self, name: &str) -> Self {
        self.registry.unregister(name);
        self
    }

    /// Replace the registry wholesale.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the worker pool size.
    ///
    /// Default: 10
    pub fn max_concurrent_calls(mut self, limit: usize) -> Self {
        self.config.max_concurrent_calls = limit;
        self
    }

    /// Set what happens when a handler fails.
    ///
    /// Default: [`FailurePolicy::Isolate`]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Set the largest accepted request payload and the largest response
    /// payload the server will send.
    ///
    /// Default: 16 MiB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the per-connection writer queue length.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and open the listener.
    ///
    /// Fails with [`CallwireError::Config`] when the worker pool size is 0
    /// or the port cannot be bound. Nothing is left listening on failure.
    pub async fn bind(self, endpoint: Endpoint) -> Result<Server> {
        if self.config.max_concurrent_calls == 0 {
            return Err(CallwireError::Config(
                "max_concurrent_calls must be at least 1".to_string(),
            ));
        }

        let listener = TcpListener::bind(endpoint.socket_addr())
            .await
            .map_err(|e| CallwireError::Config(format!("cannot bind {}: {}", endpoint, e)))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            addr = %local_addr,
            functions = ?self.registry.names(),
            "Server bound"
        );

        let (stop_tx, _) = watch::channel(false);
        let state = Arc::new(watch::channel(ServerState::Bound).0);

        Ok(Server {
            listener,
            local_addr,
            dispatcher: Arc::new(Dispatcher::new(
                self.registry,
                self.config.max_concurrent_calls,
                self.config.failure_policy,
            )),
            config: self.config,
            handle: ServerHandle {
                stop: Arc::new(stop_tx),
                state: state.clone(),
            },
            stopped: StoppedOnDrop(state),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A server with an open listener and a frozen handler registry.
///
/// Dropping a `Server`, served or not, releases the listener and moves
/// the state to [`ServerState::Stopped`].
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
    handle: ServerHandle,
    // Last field: dropped after the listener.
    stopped: StoppedOnDrop,
}

/// Publishes [`ServerState::Stopped`] when dropped, including when a
/// `serve` future is aborted.
struct StoppedOnDrop(Arc<watch::Sender<ServerState>>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.send_replace(ServerState::Stopped);
    }
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server and observing its state.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Accept connections until [`ServerHandle::shutdown`] is called.
    ///
    /// The listener is closed before this returns; connections stop
    /// reading new calls, and calls already in flight still deliver their
    /// responses.
    pub async fn serve(self) -> Result<()> {
        let Server {
            listener,
            local_addr,
            dispatcher,
            config,
            handle,
            stopped,
        } = self;

        let mut stop = handle.stop.subscribe();
        let mut connections = JoinSet::new();

        handle.state.send_replace(ServerState::Serving);
        tracing::info!(addr = %local_addr, "Serving");

        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop) => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let connection = Connection {
                            stream,
                            peer,
                            dispatcher: dispatcher.clone(),
                            max_payload_size: config.max_payload_size,
                            channel_capacity: config.channel_capacity,
                        };
                        connections.spawn(connection.run(handle.stop.subscribe()));
                    }
                    Err(e) => tracing::warn!("Accept failed: {}", e),
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_connection_end(finished);
                }
            }
        }

        drop(listener);
        tracing::info!(addr = %local_addr, "Listener closed, draining connections");

        while let Some(finished) = connections.join_next().await {
            log_connection_end(finished);
        }

        drop(stopped);
        tracing::info!(addr = %local_addr, "Server stopped");
        Ok(())
    }
}

fn log_connection_end(finished: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Connection ended with error: {}", e),
        Err(e) => tracing::error!("Connection task failed: {}", e),
    }
}

/// Cloneable handle to a bound server.
#[derive(Clone)]
pub struct ServerHandle {
    stop: Arc<watch::Sender<bool>>,
    state: Arc<watch::Sender<ServerState>>,
}

impl ServerHandle {
    /// Ask the server to stop accepting connections. Idempotent; safe to
    /// call from a signal-handling task.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Wait until the server has released its listener.
    ///
    /// Resolves once `serve` returns, or once the `Server` (or its `serve`
    /// future) is dropped.
    pub async fn stopped(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| *s == ServerState::Stopped).await;
    }
}

/// Resolve once the stop flag is raised.
pub(crate) async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *stop.borrow_and_update();
        if stopped || stop.changed().await.is_err() {
            return;
        }
    }
}
