//! Error types for the H4 transport.

use thiserror::Error;

/// Main error type for all H4 transport operations.
#[derive(Debug, Error)]
pub enum H4Error {
    /// I/O error on the underlying stream (connect, read or write failure).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A byte that is not one of the four H4 type tags arrived where a new
    /// frame was expected.
    #[error("unknown H4 packet type tag: {0:#04x}")]
    UnknownPacketType(u8),

    /// The deframer hit a fatal framing error earlier; the byte stream can
    /// no longer be trusted and every further feed fails.
    #[error("H4 stream is desynchronized")]
    Desynchronized,

    /// The channel was closed (peer hung up, `close()` was called, or the
    /// writer task is gone).
    #[error("connection closed")]
    ConnectionClosed,

    /// The write-retry loop made no progress.
    #[error("write returned zero bytes")]
    WriteZero,
}

impl H4Error {
    /// Whether this error came out of the framing layer (as opposed to the
    /// socket). A framing error means host and controller disagree about
    /// packet boundaries; the connection must be torn down.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            H4Error::UnknownPacketType(_) | H4Error::Desynchronized
        )
    }
}

/// Result type alias using H4Error.
pub type Result<T> = std::result::Result<T, H4Error>;
