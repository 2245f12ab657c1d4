//! Dedicated writer task serializing all outbound frames.
//!
//! Any number of tasks may call [`H4Channel::send`](crate::transport::H4Channel::send)
//! concurrently, but a packet's bytes must reach the controller as one
//! uninterrupted sequence — the peer's deframing depends on it. Instead of a
//! mutex around the write half, senders push pre-framed packets into an mpsc
//! channel drained by a single writer task:
//!
//! ```text
//! Sender 1 ─┐
//! Sender 2 ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► Socket
//! Sender N ─┘
//! ```
//!
//! The bounded channel doubles as backpressure, and the single drain point
//! lets multiple ready frames batch into one `write_vectored` syscall.
//! Partial writes are always retried to completion; leaving one un-retried
//! would desynchronize the peer irrecoverably.

use std::io::IoSlice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{H4Error, Result};
use crate::protocol::PacketType;

/// Default channel capacity (frames in flight before senders wait).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames to batch into a single vectored write.
const MAX_BATCH_SIZE: usize = 64;

/// Wire type tag size.
const TAG_SIZE: usize = 1;

/// A frame ready to be written to the socket.
///
/// The type tag is kept separate from the payload so the two can go out as
/// one vectored write without copying the caller's buffer.
#[derive(Debug)]
pub struct OutboundFrame {
    /// The 1-byte H4 type tag.
    pub tag: [u8; TAG_SIZE],
    /// Header + payload exactly as supplied by the upper layer.
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Frame a packet for transmission.
    #[inline]
    pub fn new(packet_type: PacketType, payload: Bytes) -> Self {
        Self {
            tag: [packet_type.tag()],
            payload,
        }
    }

    /// Total wire size of this frame (tag + payload).
    #[inline]
    pub fn size(&self) -> usize {
        TAG_SIZE + self.payload.len()
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for submitting frames to the writer task.
///
/// Cheaply cloneable; each clone shares the same queue and pending counter.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
    /// Frames queued but not yet written.
    pending: Arc<AtomicUsize>,
}

impl WriterHandle {
    /// Queue a frame for transmission.
    ///
    /// Waits when the queue is full (bounded-channel backpressure). Returns
    /// `H4Error::ConnectionClosed` once the writer task is gone.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.pending.fetch_add(1, Ordering::AcqRel);

        self.tx.send(frame).await.map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Release);
            H4Error::ConnectionClosed
        })
    }

    /// Frames queued but not yet on the wire.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Spawn the writer task over the given write half.
///
/// Returns the sender handle and the task's join handle. The task exits
/// cleanly when every `WriterHandle` clone has been dropped.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle {
        tx,
        pending: pending.clone(),
    };

    let task = tokio::spawn(writer_loop(rx, writer, pending));

    (handle, task)
}

/// Main writer loop - drains the queue and writes frames to the socket.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut writer: W,
    pending: Arc<AtomicUsize>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(f) => f,
            // All handles dropped, clean shutdown.
            None => return Ok(()),
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        let batch_size = batch.len();
        if let Err(err) = write_batch(&mut writer, &batch).await {
            tracing::error!(%err, "writer task terminating");
            return Err(err);
        }

        pending.fetch_sub(batch_size, Ordering::Release);
    }
}

/// Write a batch of frames with scatter/gather I/O, retrying partial writes
/// until every byte is on the wire.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let mut slices: Vec<IoSlice<'_>> = Vec::with_capacity(batch.len() * 2);
    for frame in batch {
        slices.push(IoSlice::new(&frame.tag));
        if !frame.payload.is_empty() {
            slices.push(IoSlice::new(&frame.payload));
        }
    }

    let total_size: usize = batch.iter().map(|f| f.size()).sum();

    let written = writer.write_vectored(&slices).await?;
    if written == 0 {
        return Err(H4Error::WriteZero);
    }

    let mut total_written = written;

    // Slow path: short write. Rebuild the remaining slices and keep going;
    // a frame must never be left half-transmitted.
    while total_written < total_size {
        let remaining = build_remaining_slices(batch, total_written);
        if remaining.is_empty() {
            break;
        }

        let written = writer.write_vectored(&remaining).await?;
        if written == 0 {
            return Err(H4Error::WriteZero);
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the IoSlice array covering everything after `skip_bytes`.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut skipped = 0;

    for frame in batch {
        let tag_end = skipped + TAG_SIZE;
        if skip_bytes < tag_end {
            slices.push(IoSlice::new(&frame.tag));
        }
        skipped = tag_end;

        if !frame.payload.is_empty() {
            let payload_end = skipped + frame.payload.len();
            if skip_bytes < payload_end {
                let start = skip_bytes.saturating_sub(skipped);
                slices.push(IoSlice::new(&frame.payload[start..]));
            }
            skipped = payload_end;
        }
    }

    slices
}
