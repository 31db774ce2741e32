//! Per-connection writer task.
//!
//! Every call on a connection runs in its own task, so responses are
//! funnelled through an mpsc channel into one task that owns the socket's
//! write half. Frames from concurrent calls never interleave on the wire.
//!
//! ```text
//! Call 1 ─┐
//! Call 2 ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► TCP write half
//! Call N ─┘
//! ```
//!
//! Frames that are ready together are written with one `write_vectored`.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{CallwireError, Result};
use crate::protocol::{Header, HEADER_SIZE};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// A frame ready to be written to the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded header.
    pub header: [u8; HEADER_SIZE],
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Create a new outbound frame. `header.payload_length` must match `payload`.
    #[inline]
    pub fn new(header: &Header, payload: Bytes) -> Self {
        debug_assert_eq!(header.payload_length as usize, payload.len());
        Self {
            header: header.encode(),
            payload,
        }
    }

    /// Total size of this frame (header + payload).
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Handle for sending frames to the writer task. Cheap to clone.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame for writing.
    ///
    /// Fails with `ConnectionClosed` once the writer task has stopped.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| CallwireError::ConnectionClosed)
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task exits cleanly once every [`WriterHandle`] has been dropped and
/// the queue is flushed, or with an error if the socket write fails.
pub fn spawn_writer_task<W>(writer: W, channel_capacity: usize) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);

    while let Some(first) = rx.recv().await {
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
        batch.clear();
    }

    writer.shutdown().await?;
    Ok(())
}

/// Write a batch of frames using scatter/gather I/O.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total_size: usize = batch.iter().map(OutboundFrame::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = remaining_slices(batch, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(CallwireError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// IoSlices covering everything after the first `skip_bytes` of the batch.
fn remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for frame in batch {
        for part in [&frame.header[..], &frame.payload[..]] {
            let end = offset + part.len();
            if !part.is_empty() && skip_bytes < end {
                slices.push(IoSlice::new(&part[skip_bytes.saturating_sub(offset)..]));
            }
            offset = end;
        }
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, FrameBuffer, CALL_METHOD_ID};
    use std::io::Cursor;
    use tokio::io::{duplex, AsyncReadExt};

    fn frame(request_id: u32, payload: &'static [u8]) -> OutboundFrame {
        let header = Header::new(CALL_METHOD_ID, flags::RESPONSE, request_id, payload.len() as u32);
        OutboundFrame::new(&header, Bytes::from_static(payload))
    }

    #[test]
    fn test_outbound_frame_size() {
        assert_eq!(frame(1, b"hello").size(), HEADER_SIZE + 5);
        assert_eq!(frame(1, b"").size(), HEADER_SIZE);
    }

    #[test]
    fn test_remaining_slices() {
        let batch = vec![frame(1, b"hello")];

        assert_eq!(remaining_slices(&batch, 0).len(), 2);

        let partial = remaining_slices(&batch, 5);
        assert_eq!(partial[0].len(), HEADER_SIZE - 5);
        assert_eq!(partial[1].len(), 5);

        let payload_only = remaining_slices(&batch, HEADER_SIZE + 2);
        assert_eq!(payload_only.len(), 1);
        assert_eq!(&payload_only[0][..], b"llo");
    }

    #[test]
    fn test_remaining_slices_skips_empty_payloads() {
        let batch = vec![frame(1, b""), frame(2, b"ab")];
        assert_eq!(remaining_slices(&batch, 0).len(), 3);
    }

    #[tokio::test]
    async fn test_write_batch_multiple() {
        let mut buf = Cursor::new(Vec::new());
        let batch: Vec<_> = (0..5).map(|i| frame(i, b"abc")).collect();

        write_batch(&mut buf, &batch).await.unwrap();

        let written = buf.into_inner();
        assert_eq!(written.len(), 5 * (HEADER_SIZE + 3));

        let frames = FrameBuffer::new().push(&written).unwrap();
        let ids: Vec<u32> = frames.iter().map(|f| f.request_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_writer_task_delivers_and_closes() {
        let (client, mut server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client, 8);

        for i in 0..10u32 {
            handle.send(frame(i, b"data")).await.unwrap();
        }
        drop(handle);
        task.await.unwrap().unwrap();

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received.len(), 10 * (HEADER_SIZE + 4));
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped() {
        let (client, server) = duplex(64);
        drop(server);
        let (handle, task) = spawn_writer_task(client, 1);

        // First write hits the closed pipe and ends the task.
        let _ = handle.send(frame(1, b"x")).await;
        assert!(task.await.unwrap().is_err());

        let err = handle.send(frame(2, b"y")).await.unwrap_err();
        assert!(matches!(err, CallwireError::ConnectionClosed));
    }
}
