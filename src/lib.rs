//! # h4-transport
//!
//! Host side of the Bluetooth HCI UART Transport Layer ("H4"): the
//! byte-oriented framing that multiplexes the four HCI packet streams
//! (Command, Event, ACL, SCO) over a single duplex byte stream — a TCP
//! socket to a virtual controller here, but the framing is identical over a
//! UART or any other stream transport.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): the packet type table, the deframer state
//!   machine that reassembles packets from arbitrarily-chunked reads, and
//!   outbound frame encoding (a 1-byte type tag in front of a caller-built
//!   HCI buffer).
//! - **Transport** ([`transport`]): [`H4Channel`] owns the stream, runs one
//!   dedicated read-loop task and one writer task, and dispatches every
//!   assembled packet to a [`PacketSink`] in arrival order.
//!
//! This crate is the transport multiplexer only: it knows where each packet
//! type keeps its length field, and nothing about what the payloads mean.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use h4_transport::{ChannelConfig, H4Channel, PacketSink};
//!
//! #[tokio::main]
//! async fn main() -> h4_transport::Result<()> {
//!     let sink = Arc::new(MySink::new());
//!     let channel = H4Channel::connect("127.0.0.1:6402", sink, ChannelConfig::default()).await?;
//!
//!     // HCI Reset: opcode 0x0c03, no parameters
//!     channel.send_command(&[0x03, 0x0c, 0x00]).await?;
//!
//!     channel.closed().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;
pub mod writer;

pub use config::ChannelConfig;
pub use error::{H4Error, Result};
pub use protocol::{Deframer, H4Packet, PacketType, ResyncPolicy};
pub use sink::PacketSink;
pub use transport::H4Channel;
