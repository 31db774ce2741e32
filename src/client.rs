//! Call client.
//!
//! [`call`] is the one-shot form: connect, send one request, wait for the
//! response, close. [`Client`] keeps a connection open for several
//! sequential calls. Neither retries: every call is exactly one attempt.
//!
//! # Example
//!
//! ```no_run
//! use callwire::{client, CallRequest, Endpoint};
//!
//! #[tokio::main]
//! async fn main() -> callwire::Result<()> {
//!     let endpoint = Endpoint::local(9090)?;
//!     let response = client::call(&endpoint, CallRequest::without_argument("SayHello")).await?;
//!     println!("{} {}", response.success(), response.result_str());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::codec::MsgPackCodec;
use crate::endpoint::Endpoint;
use crate::error::{CallwireError, Result};
use crate::message::{CallRequest, CallResponse};
use crate::protocol::{
    build_frame, flags, Frame, FrameBuffer, CALL_METHOD_ID, DEFAULT_MAX_PAYLOAD_SIZE,
    PING_METHOD_ID,
};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Client-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for one call, connect included. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Largest accepted response payload.
    pub max_payload_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl ClientConfig {
    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the largest accepted response payload.
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.max_payload_size = size;
        self
    }
}

/// Send one call to `endpoint` over a fresh connection.
///
/// The connection is closed on every exit path.
pub async fn call(endpoint: &Endpoint, request: CallRequest) -> Result<CallResponse> {
    call_with(endpoint, request, ClientConfig::default()).await
}

/// [`call`] with explicit configuration.
pub async fn call_with(
    endpoint: &Endpoint,
    request: CallRequest,
    config: ClientConfig,
) -> Result<CallResponse> {
    let timeout = config.timeout;
    with_timeout(timeout, async move {
        let mut client = Client::open(endpoint, config).await?;
        let response = client.exchange_call(request).await;
        client.close().await;
        response
    })
    .await
}

/// A connection to a dispatch server, used for sequential calls.
pub struct Client {
    stream: TcpStream,
    frame_buffer: FrameBuffer,
    read_buf: Vec<u8>,
    next_request_id: u32,
    config: ClientConfig,
}

impl Client {
    /// Connect with the default configuration.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        Self::connect_with(endpoint, ClientConfig::default()).await
    }

    /// Connect with explicit configuration. The timeout also bounds the connect.
    pub async fn connect_with(endpoint: &Endpoint, config: ClientConfig) -> Result<Self> {
        with_timeout(config.timeout, Self::open(endpoint, config.clone())).await
    }

    async fn open(endpoint: &Endpoint, config: ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect(endpoint.socket_addr()).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(%endpoint, "Connected");

        Ok(Self {
            stream,
            frame_buffer: FrameBuffer::with_max_payload(config.max_payload_size),
            read_buf: vec![0u8; READ_BUFFER_SIZE],
            next_request_id: 1,
            config,
        })
    }

    /// Send `request` and wait for its response.
    ///
    /// An unregistered function name is not an error: it comes back as
    /// `CallResponse { success: false, result_buffer: "unknown" }`.
    pub async fn call(&mut self, request: CallRequest) -> Result<CallResponse> {
        with_timeout(self.config.timeout, self.exchange_call(request)).await
    }

    /// Check that the server is alive.
    pub async fn ping(&mut self) -> Result<()> {
        with_timeout(self.config.timeout, async {
            self.exchange(PING_METHOD_ID, &[]).await.map(|_| ())
        })
        .await
    }

    /// Close the connection.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }

    async fn exchange_call(&mut self, request: CallRequest) -> Result<CallResponse> {
        tracing::debug!(function = request.function_name(), "Calling");
        let payload = MsgPackCodec::encode(&request)?;
        let frame = self.exchange(CALL_METHOD_ID, &payload).await?;
        MsgPackCodec::decode(frame.payload())
    }

    /// Write one request frame and read frames until its response arrives.
    async fn exchange(&mut self, method_id: u16, payload: &[u8]) -> Result<Frame> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);

        self.stream
            .write_all(&build_frame(method_id, flags::REQUEST, request_id, payload))
            .await?;

        loop {
            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(CallwireError::ConnectionClosed);
            }

            for frame in self.frame_buffer.push(&self.read_buf[..n])? {
                if !frame.is_response() || frame.request_id() != request_id {
                    // Leftover reply from a call abandoned by a timeout.
                    tracing::debug!(request_id = frame.request_id(), "Discarding stale frame");
                    continue;
                }
                if frame.method_id() != method_id {
                    return Err(CallwireError::Protocol(format!(
                        "response method {} does not match request method {}",
                        frame.method_id(),
                        method_id
                    )));
                }
                if frame.is_error() {
                    let message: String = MsgPackCodec::decode(frame.payload())?;
                    return Err(CallwireError::Remote(message));
                }
                return Ok(frame);
            }
        }
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CallwireError::Timeout(limit))?,
        None => fut.await,
    }
}
