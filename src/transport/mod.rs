//! Transport module - the socket-owning channel.
//!
//! The channel is generic over any duplex byte stream (`AsyncRead +
//! AsyncWrite`), so the framing layer is testable against in-memory pipes;
//! TCP to a virtual controller is just the production instantiation.

mod channel;

pub use channel::H4Channel;
