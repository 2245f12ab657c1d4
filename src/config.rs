//! Channel configuration.
//!
//! Endpoint selection (host/port of the virtual controller, or whatever
//! duplex stream stands in for the UART) is the caller's concern and is
//! passed to the channel at initialization time only; everything tunable
//! about the channel itself lives here.

use crate::protocol::ResyncPolicy;
use crate::writer::WriterConfig;

/// Default read buffer size (one `read` call's worth of stream data).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for an [`H4Channel`](crate::transport::H4Channel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Size of the read loop's scratch buffer.
    pub read_buffer_size: usize,
    /// How the deframer treats an unrecognized type tag.
    pub resync_policy: ResyncPolicy,
    /// Writer task tuning.
    pub writer: WriterConfig,
}

impl ChannelConfig {
    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the unknown-tag policy.
    pub fn resync_policy(mut self, policy: ResyncPolicy) -> Self {
        self.resync_policy = policy;
        self
    }

    /// Set the writer channel capacity.
    pub fn writer_capacity(mut self, capacity: usize) -> Self {
        self.writer.channel_capacity = capacity;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            resync_policy: ResyncPolicy::default(),
            writer: WriterConfig::default(),
        }
    }
}
