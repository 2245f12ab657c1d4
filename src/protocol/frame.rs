//! Assembled H4 packets and outbound framing.
//!
//! An [`H4Packet`] is one fully reassembled frame minus its type tag: the
//! HCI header and payload as a single opaque buffer, held in `bytes::Bytes`
//! for zero-copy hand-off to the dispatch sink.
//!
//! Outbound framing is deliberately asymmetric to inbound deframing: upper
//! layers hand the transport a buffer that already contains a correct HCI
//! header (including the length field), and the transport's only job is to
//! prepend the one-byte type tag. [`encode_frame`] does exactly that and
//! nothing else — no re-derivation, no validation of the embedded length.

use bytes::Bytes;

use super::packet_type::PacketType;

/// A complete reassembled H4 packet.
///
/// `data` is header + payload in one contiguous buffer; the boundary between
/// the two is given by the type's [`FrameLayout`](super::FrameLayout), but
/// consumers normally treat the whole buffer as opaque HCI bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H4Packet {
    /// Which of the four logical streams this packet belongs to.
    pub packet_type: PacketType,
    /// Header + payload bytes, excluding the wire type tag.
    pub data: Bytes,
}

impl H4Packet {
    /// Create a packet from its type and assembled bytes.
    pub fn new(packet_type: PacketType, data: Bytes) -> Self {
        Self { packet_type, data }
    }

    /// The HCI header portion of the buffer.
    pub fn header(&self) -> &[u8] {
        &self.data[..self.packet_type.layout().header_len]
    }

    /// The payload portion of the buffer (may be empty).
    pub fn payload(&self) -> &[u8] {
        &self.data[self.packet_type.layout().header_len..]
    }

    /// The payload length declared in the header.
    pub fn declared_length(&self) -> usize {
        self.packet_type.layout().declared_length(&self.data)
    }

    /// Total size of the buffer (header + payload).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer is empty (never the case for an assembled packet).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Build a complete wire frame: type tag followed by the caller's buffer.
///
/// The caller owns header construction; `payload` must already carry the HCI
/// header with a length field matching its tail.
///
/// # Example
///
/// ```
/// use h4_transport::protocol::{encode_frame, PacketType};
///
/// // HCI Reset: opcode 0x0c03, parameter_total_length 0
/// let wire = encode_frame(PacketType::Command, &[0x03, 0x0c, 0x00]);
/// assert_eq!(wire, [0x01, 0x03, 0x0c, 0x00]);
/// ```
pub fn encode_frame(packet_type: PacketType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(packet_type.tag());
    buf.extend_from_slice(payload);
    buf
}

/// Frame parts for scatter/gather I/O: the tag as a one-byte array and the
/// untouched payload reference. Avoids copying for writev-style writes.
#[inline]
pub fn frame_parts(packet_type: PacketType, payload: &[u8]) -> ([u8; 1], &[u8]) {
    ([packet_type.tag()], payload)
}
