//! The H4 packet type table.
//!
//! H4 multiplexes four logical HCI streams over one byte stream by prefixing
//! every frame with a single type tag:
//!
//! ```text
//! ┌─────────┬──────────────────────────────┬─────────────────┐
//! │ Tag     │ Header                       │ Payload         │
//! │ 1 byte  │ 2-4 bytes (type-dependent)   │ length-driven   │
//! └─────────┴──────────────────────────────┴─────────────────┘
//! ```
//!
//! There are no delimiters, checksums or escape sequences; frame boundaries
//! are driven entirely by the length field inside each header, so the only
//! per-type knowledge the transport needs is *where* that length field lives.

use crate::error::{H4Error, Result};

/// The four H4 packet types, tagged with their on-wire prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// HCI command (host to controller).
    Command = 0x01,
    /// ACL data (bidirectional).
    Acl = 0x02,
    /// SCO data (bidirectional).
    Sco = 0x03,
    /// HCI event (controller to host).
    Event = 0x04,
}

/// Header layout of one packet type: how many header bytes follow the type
/// tag, and where inside them the payload length is encoded.
///
/// Multi-byte length fields are little endian, per the Bluetooth Core spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Header bytes following the type tag, before the variable payload.
    pub header_len: usize,
    /// Byte offset of the length field within the header.
    pub length_field_offset: usize,
    /// Width of the length field in bytes (1 or 2).
    pub length_field_size: usize,
}

/// Command header: opcode(2) + length(1).
const COMMAND_LAYOUT: FrameLayout = FrameLayout {
    header_len: 3,
    length_field_offset: 2,
    length_field_size: 1,
};

/// ACL header: handle(2) + length(2, LE).
const ACL_LAYOUT: FrameLayout = FrameLayout {
    header_len: 4,
    length_field_offset: 2,
    length_field_size: 2,
};

/// SCO header: handle(2) + length(1).
const SCO_LAYOUT: FrameLayout = FrameLayout {
    header_len: 3,
    length_field_offset: 2,
    length_field_size: 1,
};

/// Event header: event_code(1) + length(1).
const EVENT_LAYOUT: FrameLayout = FrameLayout {
    header_len: 2,
    length_field_offset: 1,
    length_field_size: 1,
};

impl PacketType {
    /// Look up a packet type from its wire tag.
    ///
    /// Returns `H4Error::UnknownPacketType` for any byte outside
    /// {0x01, 0x02, 0x03, 0x04} — the sole failure mode of the table.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x01 => Ok(PacketType::Command),
            0x02 => Ok(PacketType::Acl),
            0x03 => Ok(PacketType::Sco),
            0x04 => Ok(PacketType::Event),
            other => Err(H4Error::UnknownPacketType(other)),
        }
    }

    /// The one-byte wire tag for this type.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Header layout for this type.
    #[inline]
    pub fn layout(self) -> FrameLayout {
        match self {
            PacketType::Command => COMMAND_LAYOUT,
            PacketType::Acl => ACL_LAYOUT,
            PacketType::Sco => SCO_LAYOUT,
            PacketType::Event => EVENT_LAYOUT,
        }
    }
}

impl FrameLayout {
    /// Decode the declared payload length from a complete header.
    ///
    /// # Panics
    ///
    /// Panics if `header` is shorter than `header_len`; callers only invoke
    /// this once the full header has been accumulated.
    pub fn declared_length(&self, header: &[u8]) -> usize {
        debug_assert!(header.len() >= self.header_len);
        match self.length_field_size {
            1 => header[self.length_field_offset] as usize,
            2 => u16::from_le_bytes([
                header[self.length_field_offset],
                header[self.length_field_offset + 1],
            ]) as usize,
            _ => unreachable!("length fields are 1 or 2 bytes"),
        }
    }
}
