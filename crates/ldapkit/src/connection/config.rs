//! Connection configuration types.

use ldapkit_ber::{DEFAULT_MAX_DEPTH, DecoderConfig};

/// Default read buffer capacity.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// Default maximum size of one inbound message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Limits applied to the inbound side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Largest complete message accepted, header included.
    pub max_message_size: usize,
    /// Maximum nesting depth of a decoded message.
    pub max_depth: usize,
    /// Capacity of the read buffer.
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Returns the decoder limits matching this configuration.
    #[must_use]
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new()
            .max_depth(self.max_depth)
            .max_length(self.max_message_size)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest inbound message accepted.
    #[must_use]
    pub const fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Sets the read buffer capacity.
    #[must_use]
    pub const fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> Config {
        self.config
    }
}
