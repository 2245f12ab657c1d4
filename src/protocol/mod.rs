//! Protocol module - the H4 wire format.
//!
//! This module implements H4 framing below the HCI layer:
//! - the packet type table (tag bytes and header layouts)
//! - the deframer state machine for reassembling inbound packets
//! - outbound frame encoding (type tag prefix)

mod deframer;
mod frame;
mod packet_type;

pub use deframer::{Deframer, ResyncPolicy};
pub use frame::{encode_frame, frame_parts, H4Packet};
pub use packet_type::{FrameLayout, PacketType};
