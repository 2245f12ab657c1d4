//! The H4 channel: one duplex stream, one read loop, one writer task.
//!
//! Lifecycle:
//! 1. [`H4Channel::connect`] (TCP) or [`H4Channel::from_stream`] (any duplex
//!    stream) splits the stream and spawns the read-loop and writer tasks.
//! 2. The read loop feeds every chunk to the [`Deframer`] and dispatches
//!    each completed packet to the [`PacketSink`], in arrival order.
//! 3. `send_*` frames a caller-built HCI buffer with its type tag and queues
//!    it on the writer task, which guarantees contiguous transmission.
//! 4. [`H4Channel::close`] aborts both tasks; peer close or a stream error
//!    ends the read loop on its own, reported once via
//!    [`PacketSink::transport_closed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ChannelConfig;
use crate::error::{H4Error, Result};
use crate::protocol::{Deframer, H4Packet, PacketType};
use crate::sink::PacketSink;
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

/// A running H4 transport channel.
///
/// Cheap to share behind an `Arc`; `send` is safe from any number of tasks.
pub struct H4Channel {
    /// Queue into the writer task.
    writer: WriterHandle,
    /// Read-loop task, aborted on close.
    read_task: JoinHandle<()>,
    /// Writer task, aborted on close.
    writer_task: JoinHandle<Result<()>>,
    /// Resolves when the read loop exits.
    shutdown_rx: std::sync::Mutex<Option<oneshot::Receiver<()>>>,
    /// Set once `close()` has run.
    closed: AtomicBool,
}

impl H4Channel {
    /// Connect to a virtual controller over TCP and start the channel.
    ///
    /// The address comes from the caller's configuration layer; this crate
    /// imposes no reconnect or retry policy — a failed connect is returned
    /// once, here.
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        sink: Arc<dyn PacketSink>,
        config: ChannelConfig,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        // Command/event exchanges are small and latency-bound.
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream, sink, config))
    }

    /// Start the channel over an already-connected duplex stream.
    ///
    /// This is the initialization step proper: it wires the deframer's
    /// output to `sink` and spawns exactly one read-loop task and one
    /// writer task.
    pub fn from_stream<S>(stream: S, sink: Arc<dyn PacketSink>, config: ChannelConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);

        let (writer, writer_task) = spawn_writer_task(write_half, config.writer.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let deframer = Deframer::with_policy(config.resync_policy);
        let read_buffer_size = config.read_buffer_size;

        let read_task = tokio::spawn(async move {
            let cause = read_loop(reader, deframer, &sink, read_buffer_size).await;
            sink.transport_closed(cause);
            let _ = shutdown_tx.send(());
        });

        Self {
            writer,
            read_task,
            writer_task,
            shutdown_rx: std::sync::Mutex::new(Some(shutdown_rx)),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue one packet for contiguous transmission.
    ///
    /// `payload` must already carry its HCI header (including the length
    /// field); the transport only prepends the type tag.
    pub async fn send(&self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(H4Error::ConnectionClosed);
        }

        let frame = OutboundFrame::new(packet_type, Bytes::copy_from_slice(payload));
        self.writer.send(frame).await
    }

    /// Send an HCI command packet (opcode + length + parameters).
    pub async fn send_command(&self, packet: &[u8]) -> Result<()> {
        self.send(PacketType::Command, packet).await
    }

    /// Send an ACL data packet (handle + length + data).
    pub async fn send_acl(&self, packet: &[u8]) -> Result<()> {
        self.send(PacketType::Acl, packet).await
    }

    /// Send a SCO data packet (handle + length + data).
    ///
    /// Events are inbound-only by protocol convention; there is no
    /// `send_event`.
    pub async fn send_sco(&self, packet: &[u8]) -> Result<()> {
        self.send(PacketType::Sco, packet).await
    }

    /// Tear the channel down: stop the read loop and the writer task.
    ///
    /// Idempotent, and safe to call at any point after construction. Frames
    /// still queued in the writer are discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.read_task.abort();
        self.writer_task.abort();
    }

    /// Wait until the read loop has exited (peer close, stream error, or a
    /// local `close()`).
    pub async fn closed(&self) {
        let rx = match self.shutdown_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(rx) = rx {
            // Err means the read task was aborted; either way it is gone.
            let _ = rx.await;
        }
    }

    /// Frames queued on the writer but not yet on the wire.
    pub fn pending_frames(&self) -> usize {
        self.writer.pending_count()
    }
}

impl Drop for H4Channel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read loop body. Returns the close cause: `None` for EOF, `Some` for an
/// I/O or framing error.
async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    mut deframer: Deframer,
    sink: &Arc<dyn PacketSink>,
    read_buffer_size: usize,
) -> Option<H4Error> {
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return None, // peer closed
            Ok(n) => n,
            Err(e) => return Some(H4Error::Io(e)),
        };

        let packets = match deframer.feed(&buf[..n]) {
            Ok(packets) => packets,
            Err(err) => return Some(err),
        };

        for packet in packets {
            dispatch(sink, packet);
        }
    }
}

/// Route one assembled packet to its per-type callback.
fn dispatch(sink: &Arc<dyn PacketSink>, packet: H4Packet) {
    tracing::trace!(
        packet_type = ?packet.packet_type,
        len = packet.len(),
        "dispatching packet"
    );

    match packet.packet_type {
        PacketType::Command => sink.command_received(packet.data),
        PacketType::Event => sink.event_received(packet.data),
        PacketType::Acl => sink.acl_received(packet.data),
        PacketType::Sco => sink.sco_received(packet.data),
    }
}
