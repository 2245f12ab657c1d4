//! The dispatch sink: per-type callbacks invoked for every assembled packet.

use bytes::Bytes;

use crate::error::H4Error;

/// Upper-layer callback interface, invoked once per fully assembled packet.
///
/// All packet callbacks run synchronously on the channel's read task, in
/// byte-stream arrival order across types (FIFO per connection). A callback
/// that blocks stalls all further reads, so implementations should hand the
/// buffer off (e.g. into an mpsc channel) rather than process inline.
///
/// Each callback receives the packet's header + payload as one opaque
/// buffer; the wire type tag has already been consumed by the deframer.
pub trait PacketSink: Send + Sync + 'static {
    /// An HCI command packet arrived.
    ///
    /// Commands flow host-to-controller, so a host-side channel does not
    /// expect these; the default implementation logs and drops the packet.
    fn command_received(&self, packet: Bytes) {
        tracing::warn!(len = packet.len(), "dropping unexpected inbound command packet");
    }

    /// An HCI event packet arrived.
    fn event_received(&self, packet: Bytes);

    /// An ACL data packet arrived.
    fn acl_received(&self, packet: Bytes);

    /// A SCO data packet arrived.
    fn sco_received(&self, packet: Bytes);

    /// The read loop terminated. Called exactly once per channel lifetime:
    /// `None` for an orderly peer close (EOF), `Some` for an I/O or framing
    /// error. Not called when the local side calls `close()`.
    fn transport_closed(&self, cause: Option<H4Error>) {
        match cause {
            None => tracing::debug!("H4 transport closed by peer"),
            Some(err) => tracing::error!(%err, "H4 transport closed"),
        }
    }
}
