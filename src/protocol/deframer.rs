//! H4 deframer: reassembles packets from an arbitrarily-chunked byte stream.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. A state machine
//! tracks where in the current frame the stream position sits:
//! - `AwaitingTypeTag`: need the 1-byte type prefix
//! - `AwaitingHeader`: tag consumed, need the type's full header
//! - `AwaitingPayload`: length decoded, need the remaining payload bytes
//!
//! A single `feed` may deliver a partial header, a partial payload, several
//! concatenated frames, or any byte-aligned split thereof; assembly state
//! carries over between calls and the emitted packet sequence is identical
//! no matter how the input is chunked.
//!
//! # Example
//!
//! ```
//! use h4_transport::protocol::Deframer;
//!
//! let mut deframer = Deframer::new();
//!
//! // Event 0x0e, parameter_total_length 1, one parameter byte
//! let packets = deframer.feed(&[0x04, 0x0e, 0x01, 0x2a]).unwrap();
//! assert_eq!(packets.len(), 1);
//! assert_eq!(&packets[0].data[..], &[0x0e, 0x01, 0x2a]);
//! ```

use bytes::{Bytes, BytesMut};

use crate::error::{H4Error, Result};

use super::frame::H4Packet;
use super::packet_type::PacketType;

/// What to do when a byte that matches no H4 type tag arrives where a new
/// frame was expected.
///
/// Default is [`Fatal`](ResyncPolicy::Fatal): an unknown tag means host and
/// controller disagree about frame boundaries, and skipping bytes until one
/// happens to look like a tag can silently mask corruption. `SkipByte` is
/// available for tolerant captures and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncPolicy {
    /// Report the error and refuse all further input.
    #[default]
    Fatal,
    /// Log, discard the byte, and retry at the next one.
    SkipByte,
}

/// Parser state. The scratch buffer always holds only bytes belonging to the
/// frame currently being assembled (plus any not-yet-examined trailing bytes
/// from the last feed).
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the 1-byte type tag of the next frame.
    AwaitingTypeTag,
    /// Tag consumed; waiting for the type's complete header.
    AwaitingHeader { packet_type: PacketType },
    /// Length decoded; waiting for `total_len` bytes of header + payload.
    AwaitingPayload {
        packet_type: PacketType,
        total_len: usize,
    },
    /// A fatal framing error occurred; the stream position is unknowable.
    Desynchronized,
}

/// Stateful byte-stream-to-packet reassembler.
///
/// Owned and driven by a single reader; no internal synchronization.
pub struct Deframer {
    /// Accumulated bytes not yet emitted as packets.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Unknown-tag handling.
    policy: ResyncPolicy,
    /// Bytes discarded while resynchronizing (SkipByte policy only).
    skipped_bytes: u64,
}

impl Deframer {
    /// Create a deframer with the default (fatal) unknown-tag policy.
    pub fn new() -> Self {
        Self::with_policy(ResyncPolicy::default())
    }

    /// Create a deframer with an explicit unknown-tag policy.
    pub fn with_policy(policy: ResyncPolicy) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::AwaitingTypeTag,
            policy,
            skipped_bytes: 0,
        }
    }

    /// Feed raw bytes from the stream and extract all completed packets.
    ///
    /// Returns zero or more packets in arrival order. Partial frames stay
    /// buffered for the next call; trailing bytes of a following frame in
    /// the same read are processed against the fresh state, never dropped.
    ///
    /// # Errors
    ///
    /// `H4Error::UnknownPacketType` on the first unrecognized tag under the
    /// fatal policy, `H4Error::Desynchronized` on every feed after that.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<H4Packet>> {
        if matches!(self.state, State::Desynchronized) {
            return Err(H4Error::Desynchronized);
        }

        self.buffer.extend_from_slice(data);

        let mut packets = Vec::new();
        while let Some(packet) = self.try_extract_one()? {
            packets.push(packet);
        }

        Ok(packets)
    }

    /// Advance the state machine as far as the buffered bytes allow.
    ///
    /// Returns `Ok(Some(packet))` when a frame completed, `Ok(None)` when
    /// more bytes are needed.
    fn try_extract_one(&mut self) -> Result<Option<H4Packet>> {
        loop {
            match self.state {
                State::AwaitingTypeTag => {
                    let Some(&tag) = self.buffer.first() else {
                        return Ok(None);
                    };
                    let _ = self.buffer.split_to(1);

                    match PacketType::from_tag(tag) {
                        Ok(packet_type) => {
                            self.state = State::AwaitingHeader { packet_type };
                        }
                        Err(err) => match self.policy {
                            ResyncPolicy::Fatal => {
                                tracing::error!(tag, "unknown H4 type tag, stream desynchronized");
                                self.state = State::Desynchronized;
                                self.buffer.clear();
                                return Err(err);
                            }
                            ResyncPolicy::SkipByte => {
                                self.skipped_bytes += 1;
                                tracing::warn!(tag, "skipping unknown H4 type tag");
                            }
                        },
                    }
                }

                State::AwaitingHeader { packet_type } => {
                    let layout = packet_type.layout();
                    if self.buffer.len() < layout.header_len {
                        return Ok(None);
                    }

                    // Header is complete; decode the declared length without
                    // consuming so header + payload leave as one buffer.
                    let declared = layout.declared_length(&self.buffer[..layout.header_len]);
                    self.state = State::AwaitingPayload {
                        packet_type,
                        total_len: layout.header_len + declared,
                    };
                }

                State::AwaitingPayload {
                    packet_type,
                    total_len,
                } => {
                    // A declared length of 0 makes total_len == header_len,
                    // which is already buffered: the frame completes here
                    // without waiting for any payload byte.
                    if self.buffer.len() < total_len {
                        return Ok(None);
                    }

                    let data: Bytes = self.buffer.split_to(total_len).freeze();
                    self.state = State::AwaitingTypeTag;
                    return Ok(Some(H4Packet::new(packet_type, data)));
                }

                State::Desynchronized => return Err(H4Error::Desynchronized),
            }
        }
    }

    /// Bytes currently buffered (partial frame and/or unexamined tail).
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes discarded so far under the SkipByte policy.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One wire frame: tag + header (length filled in) + payload of `len`
    /// bytes, every non-length byte 0x01 like the reference packet shapes.
    fn make_frame(packet_type: PacketType, payload_len: usize) -> Vec<u8> {
        let layout = packet_type.layout();
        let mut frame = vec![0x01u8; 1 + layout.header_len + payload_len];
        frame[0] = packet_type.tag();
        let off = 1 + layout.length_field_offset;
        match layout.length_field_size {
            1 => frame[off] = payload_len as u8,
            2 => frame[off..off + 2].copy_from_slice(&(payload_len as u16).to_le_bytes()),
            _ => unreachable!(),
        }
        frame
    }

    #[test]
    fn test_single_complete_frame_per_type() {
        for packet_type in [
            PacketType::Command,
            PacketType::Acl,
            PacketType::Sco,
            PacketType::Event,
        ] {
            let mut deframer = Deframer::new();
            let frame = make_frame(packet_type, 3);

            let packets = deframer.feed(&frame).unwrap();

            assert_eq!(packets.len(), 1);
            assert_eq!(packets[0].packet_type, packet_type);
            assert_eq!(&packets[0].data[..], &frame[1..]);
            assert_eq!(deframer.pending_bytes(), 0);
        }
    }

    #[test]
    fn test_multiple_frames_in_one_feed() {
        let mut deframer = Deframer::new();

        let mut combined = Vec::new();
        combined.extend_from_slice(&make_frame(PacketType::Event, 3));
        combined.extend_from_slice(&make_frame(PacketType::Acl, 5));
        combined.extend_from_slice(&make_frame(PacketType::Sco, 2));

        let packets = deframer.feed(&combined).unwrap();

        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].packet_type, PacketType::Event);
        assert_eq!(packets[1].packet_type, PacketType::Acl);
        assert_eq!(packets[2].packet_type, PacketType::Sco);
        assert_eq!(deframer.pending_bytes(), 0);
    }

    #[test]
    fn test_fragmented_header() {
        let mut deframer = Deframer::new();
        let frame = make_frame(PacketType::Acl, 4);

        // Tag + half the 4-byte ACL header
        let packets = deframer.feed(&frame[..3]).unwrap();
        assert!(packets.is_empty());

        let packets = deframer.feed(&frame[3..]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].data[..], &frame[1..]);
    }

    #[test]
    fn test_fragmented_payload() {
        let mut deframer = Deframer::new();
        let frame = make_frame(PacketType::Event, 40);

        let split = 1 + 2 + 10; // tag + header + part of payload
        let packets = deframer.feed(&frame[..split]).unwrap();
        assert!(packets.is_empty());

        let packets = deframer.feed(&frame[split..]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].data[..], &frame[1..]);
    }

    #[test]
    fn test_empty_payload_completes_after_header() {
        let mut deframer = Deframer::new();

        // Event with parameter_total_length = 0, nothing after the header
        let packets = deframer.feed(&[0x04, 0x13, 0x00]).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].data[..], &[0x13, 0x00]);
        assert!(packets[0].payload().is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut deframer = Deframer::new();
        let frame = make_frame(PacketType::Command, 7);

        let mut all = Vec::new();
        for byte in &frame {
            all.extend(deframer.feed(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(&all[0].data[..], &frame[1..]);
    }

    #[test]
    fn test_chunk_invariance_all_two_way_splits() {
        let mut combined = Vec::new();
        combined.extend_from_slice(&make_frame(PacketType::Event, 3));
        combined.extend_from_slice(&make_frame(PacketType::Acl, 5));
        combined.extend_from_slice(&make_frame(PacketType::Command, 0));

        let expected = Deframer::new().feed(&combined).unwrap();
        assert_eq!(expected.len(), 3);

        for split in 0..=combined.len() {
            let mut deframer = Deframer::new();
            let mut got = deframer.feed(&combined[..split]).unwrap();
            got.extend(deframer.feed(&combined[split..]).unwrap());
            assert_eq!(got, expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_two_byte_length_field() {
        // ACL payload larger than a u8 exercises the LE 16-bit length.
        let mut deframer = Deframer::new();
        let frame = make_frame(PacketType::Acl, 300);

        let packets = deframer.feed(&frame).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].declared_length(), 300);
        assert_eq!(packets[0].payload().len(), 300);
    }

    #[test]
    fn test_volume_batch() {
        let mut deframer = Deframer::new();
        let frame = make_frame(PacketType::Acl, 5);

        let mut combined = Vec::new();
        for _ in 0..1000 {
            combined.extend_from_slice(&frame);
        }

        let packets = deframer.feed(&combined).unwrap();

        assert_eq!(packets.len(), 1000);
        for packet in &packets {
            assert_eq!(&packet.data[..], &frame[1..]);
        }
    }

    #[test]
    fn test_roundtrip_every_type_and_length() {
        use crate::protocol::encode_frame;

        for packet_type in [
            PacketType::Command,
            PacketType::Acl,
            PacketType::Sco,
            PacketType::Event,
        ] {
            let layout = packet_type.layout();
            for payload_len in 0..=255usize {
                // Header + payload buffer as an upper layer would build it
                let hci = make_frame(packet_type, payload_len)[1..].to_vec();
                let wire = encode_frame(packet_type, &hci);

                let mut deframer = Deframer::new();
                let packets = deframer.feed(&wire).unwrap();

                assert_eq!(packets.len(), 1);
                assert_eq!(packets[0].packet_type, packet_type);
                assert_eq!(&packets[0].data[..], &hci[..]);
                assert_eq!(packets[0].payload().len(), payload_len);
                assert_eq!(packets[0].header().len(), layout.header_len);
                assert_eq!(deframer.pending_bytes(), 0);
            }
        }
    }

    #[test]
    fn test_unknown_tag_is_fatal_by_default() {
        let mut deframer = Deframer::new();

        let err = deframer.feed(&[0xaa]).unwrap_err();
        assert!(matches!(err, H4Error::UnknownPacketType(0xaa)));

        // Stream is poisoned: even valid frames are rejected now.
        let err = deframer.feed(&make_frame(PacketType::Event, 1)).unwrap_err();
        assert!(matches!(err, H4Error::Desynchronized));
    }

    #[test]
    fn test_unknown_tag_mid_feed_fails_whole_feed() {
        let mut deframer = Deframer::new();

        let mut data = make_frame(PacketType::Event, 2);
        data.push(0xff);

        // The feed that hits the bad tag fails as a whole; the channel is
        // closing anyway.
        let err = deframer.feed(&data).unwrap_err();
        assert!(matches!(err, H4Error::UnknownPacketType(0xff)));
    }

    #[test]
    fn test_skip_byte_policy_resynchronizes() {
        let mut deframer = Deframer::with_policy(ResyncPolicy::SkipByte);

        let mut data = vec![0x00u8, 0xfe, 0x99];
        let frame = make_frame(PacketType::Sco, 4);
        data.extend_from_slice(&frame);

        let packets = deframer.feed(&data).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].data[..], &frame[1..]);
        assert_eq!(deframer.skipped_bytes(), 3);
    }
}
