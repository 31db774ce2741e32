//! Shared helpers for integration tests.

#![allow(dead_code)]

use callwire::{Endpoint, Result, ServerBuilder, ServerHandle};
use tokio::task::JoinHandle;

/// A loopback port nobody is listening on right now.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A running server on a loopback port.
pub struct TestServer {
    pub endpoint: Endpoint,
    pub handle: ServerHandle,
    pub task: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start(builder: ServerBuilder) -> Self {
        Self::start_on(builder, Endpoint::local(free_port()).unwrap()).await
    }

    pub async fn start_on(builder: ServerBuilder, endpoint: Endpoint) -> Self {
        let server = builder.bind(endpoint).await.unwrap();
        let handle = server.handle();
        let task = tokio::spawn(server.serve());
        Self {
            endpoint,
            handle,
            task,
        }
    }

    pub async fn stop(self) {
        self.handle.shutdown();
        self.task.await.unwrap().unwrap();
    }
}
