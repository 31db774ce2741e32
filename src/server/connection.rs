//! Per-connection read loop.
//!
//! Reads request frames, runs each call in its own task, and writes
//! responses through the connection's writer task. On shutdown the loop
//! stops reading, waits for in-flight calls to hand their responses to the
//! writer, and lets the writer flush before the socket is closed.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::dispatch::Dispatcher;
use super::wait_for_stop;
use crate::codec::MsgPackCodec;
use crate::error::{CallwireError, Result};
use crate::message::CallRequest;
use crate::protocol::{flags, Frame, FrameBuffer, Header, CALL_METHOD_ID, PING_METHOD_ID};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

const READ_BUFFER_SIZE: usize = 16 * 1024;

pub(crate) struct Connection {
    pub(crate) stream: TcpStream,
    pub(crate) peer: SocketAddr,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) max_payload_size: u32,
    pub(crate) channel_capacity: usize,
}

impl Connection {
    pub(crate) async fn run(self, mut stop: watch::Receiver<bool>) -> Result<()> {
        let Connection {
            stream,
            peer,
            dispatcher,
            max_payload_size,
            channel_capacity,
        } = self;

        tracing::debug!(%peer, "Connection accepted");

        let (mut reader, write_half) = stream.into_split();
        let (writer, writer_task) = spawn_writer_task(write_half, channel_capacity);

        let mut calls = JoinSet::new();
        let mut frame_buffer = FrameBuffer::with_max_payload(max_payload_size);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        let result = loop {
            let n = tokio::select! {
                _ = wait_for_stop(&mut stop) => break Ok(()),
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break Ok(()),
                    Ok(n) => n,
                    Err(e) => break Err(CallwireError::Io(e)),
                },
            };

            let frames = match frame_buffer.push(&buf[..n]) {
                Ok(frames) => frames,
                Err(e) => break Err(e),
            };

            for frame in frames {
                dispatch_frame(frame, &dispatcher, &writer, &mut calls, max_payload_size);
            }

            while calls.try_join_next().is_some() {}
        };

        while calls.join_next().await.is_some() {}
        drop(writer);

        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(%peer, "Writer stopped: {}", e),
            Err(e) => tracing::error!(%peer, "Writer task failed: {}", e),
        }

        tracing::debug!(%peer, "Connection closed");
        result
    }
}

fn dispatch_frame(
    frame: Frame,
    dispatcher: &Arc<Dispatcher>,
    writer: &WriterHandle,
    calls: &mut JoinSet<()>,
    max_payload_size: u32,
) {
    let header = frame.header;

    if header.is_response() {
        tracing::warn!(request_id = header.request_id, "Ignoring unexpected response frame");
        return;
    }

    let writer = writer.clone();
    match header.method_id {
        CALL_METHOD_ID => {
            let dispatcher = dispatcher.clone();
            calls.spawn(async move {
                let reply = match MsgPackCodec::decode::<CallRequest>(frame.payload()) {
                    Ok(request) => dispatcher.invoke(request).await,
                    Err(e) => Err(format!("malformed call request: {}", e)),
                };
                let outcome = match reply {
                    Ok(response) => MsgPackCodec::encode(&response).map(|p| (flags::RESPONSE, p)),
                    Err(message) => MsgPackCodec::encode(&message).map(|p| (flags::ERROR_RESPONSE, p)),
                };
                match outcome {
                    Ok((reply_flags, payload)) => {
                        send_reply(&writer, &header, reply_flags, payload, max_payload_size).await
                    }
                    Err(e) => tracing::error!(request_id = header.request_id, "Failed to encode reply: {}", e),
                }
            });
        }
        PING_METHOD_ID => {
            calls.spawn(async move {
                send_reply(&writer, &header, flags::RESPONSE, Vec::new(), max_payload_size).await;
            });
        }
        other => {
            tracing::warn!(method_id = other, "Unknown method");
            calls.spawn(async move {
                if let Ok(payload) = MsgPackCodec::encode(&format!("unknown method id {}", other)) {
                    send_reply(&writer, &header, flags::ERROR_RESPONSE, payload, max_payload_size).await;
                }
            });
        }
    }
}

/// Queue a reply frame. A payload over `max_payload_size` is replaced by
/// an error frame naming the limit.
async fn send_reply(
    writer: &WriterHandle,
    request: &Header,
    reply_flags: u8,
    payload: Vec<u8>,
    max_payload_size: u32,
) {
    let (reply_flags, payload, length) = match u32::try_from(payload.len()) {
        Ok(length) if length <= max_payload_size => (reply_flags, payload, length),
        _ => {
            let message = format!(
                "response of {} bytes exceeds the {} byte payload limit",
                payload.len(),
                max_payload_size
            );
            tracing::warn!(request_id = request.request_id, "{}", message);
            match MsgPackCodec::encode(&message) {
                Ok(encoded) => {
                    let length = encoded.len() as u32;
                    (flags::ERROR_RESPONSE, encoded, length)
                }
                Err(e) => {
                    tracing::error!(request_id = request.request_id, "Failed to encode reply: {}", e);
                    return;
                }
            }
        }
    };

    let header = request.reply(reply_flags, length);
    if writer
        .send(OutboundFrame::new(&header, Bytes::from(payload)))
        .await
        .is_err()
    {
        tracing::debug!(request_id = request.request_id, "Peer gone, dropping reply");
    }
}
