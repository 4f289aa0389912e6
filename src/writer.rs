//! Dedicated writer task for outbound frames.
//!
//! Every frame a connection sends (HELLO, responses, errors, events) goes
//! through one task that owns the write half of the stream. Producers hold a
//! cheap [`WriterHandle`] and never share a lock on the stream.
//!
//! ```text
//! Invocation 1 ─┐
//! Invocation 2 ─┼─► mpsc::Sender<Frame> ─► Writer Task ─► Stream
//! Event fwd    ─┘
//! ```
//!
//! Frames that are ready together are written with one vectored write.

use std::io::IoSlice;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, ShellwireError};
use crate::protocol::{Frame, HEADER_SIZE};

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queueing frames on the writer task.
#[derive(Debug, Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<Frame>,
}

impl WriterHandle {
    /// Queue a frame, waiting while the channel is full.
    ///
    /// Fails with `ConnectionClosed` once the writer task has stopped.
    pub(crate) async fn send(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| ShellwireError::ConnectionClosed)
    }
}

/// Spawn the writer task.
///
/// The task ends cleanly once every handle is dropped, or with the first
/// write error.
pub(crate) fn spawn_writer_task<W>(
    writer: W,
    channel_capacity: usize,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Frame>, mut writer: W) -> Result<()>
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

    writer.shutdown().await.ok();
    Ok(())
}

/// Write a batch of frames, continuing after partial vectored writes.
async fn write_batch<W>(writer: &mut W, batch: &[Frame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let headers: Vec<[u8; HEADER_SIZE]> = batch.iter().map(|f| f.header.encode()).collect();
    let total_size: usize = batch.iter().map(Frame::wire_size).sum();
    let mut written = 0;

    while written < total_size {
        let slices = remaining_slices(&headers, batch, written);
        let n = writer.write_vectored(&slices).await?;
        if n == 0 {
            return Err(ShellwireError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        written += n;
    }

    writer.flush().await?;
    Ok(())
}

/// Slices of `batch` left to write after skipping `skip_bytes`.
fn remaining_slices<'a>(
    headers: &'a [[u8; HEADER_SIZE]],
    batch: &'a [Frame],
    skip_bytes: usize,
) -> Vec<IoSlice<'a>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for (header, frame) in headers.iter().zip(batch) {
        for part in [&header[..], &frame.payload[..]] {
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
    use crate::protocol::{FrameBuffer, FrameKind};
    use bytes::Bytes;
    use std::io::Cursor;
    use tokio::io::{duplex, AsyncReadExt};

    fn frame(id: u32, payload: &'static [u8]) -> Frame {
        Frame::new(FrameKind::Response, id, Bytes::from_static(payload))
    }

    #[test]
    fn test_remaining_slices_no_skip() {
        let batch = vec![frame(1, b"hello")];
        let headers = vec![batch[0].header.encode()];
        let slices = remaining_slices(&headers, &batch, 0);
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn test_remaining_slices_partial_header() {
        let batch = vec![frame(1, b"hello")];
        let headers = vec![batch[0].header.encode()];
        let slices = remaining_slices(&headers, &batch, 5);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), HEADER_SIZE - 5);
        assert_eq!(slices[1].len(), 5);
    }

    #[test]
    fn test_remaining_slices_skip_into_second_frame() {
        let batch = vec![frame(1, b"abc"), frame(2, b"")];
        let headers: Vec<_> = batch.iter().map(|f| f.header.encode()).collect();
        let slices = remaining_slices(&headers, &batch, HEADER_SIZE + 3 + 2);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].len(), HEADER_SIZE - 2);
    }

    #[tokio::test]
    async fn test_write_batch_multiple() {
        let mut buf = Cursor::new(Vec::new());
        let batch: Vec<_> = (1..=5).map(|i| frame(i, b"abc")).collect();

        write_batch(&mut buf, &batch).await.unwrap();

        let written = buf.into_inner();
        assert_eq!(written.len(), 5 * (HEADER_SIZE + 3));
        let frames = FrameBuffer::new().push(&written).unwrap();
        let ids: Vec<_> = frames.iter().map(Frame::request_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (client, mut server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client, 16);

        for i in 1..=10u32 {
            handle.send(frame(i, b"ok")).await.unwrap();
        }
        drop(handle);
        task.await.unwrap().unwrap();

        let mut data = Vec::new();
        server.read_to_end(&mut data).await.unwrap();
        let frames = FrameBuffer::new().push(&data).unwrap();
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().zip(1..).all(|(f, i)| f.request_id() == i));
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped() {
        let (client, server) = duplex(64);
        drop(server);
        let (handle, task) = spawn_writer_task(client, 1);

        // The first write hits the closed pipe and ends the task.
        let _ = handle.send(frame(1, b"x")).await;
        assert!(task.await.unwrap().is_err());

        let err = handle.send(frame(2, b"y")).await.unwrap_err();
        assert!(matches!(err, ShellwireError::ConnectionClosed));
    }
}
