//! Relay configuration
//!
//! Defaults mirror the classic deployment profile: a 2 MB ring, 64 KB
//! upstream reads, and a 1024-connection cap on a single `:::8080`
//! listener. The stdin pipe-size override is opt-in.

mod spec;

pub use spec::{unescape, ListenerSpec, UpstreamSpec};

use crate::error::{Error, Result};

/// Default listener when none is configured
pub const DEFAULT_BIND: &str = ":::8080";
/// Default ring buffer capacity in bytes
pub const DEFAULT_RING_SIZE: usize = 2_072_576;
/// Default upstream read chunk in bytes
pub const DEFAULT_READ_CHUNK: usize = 65_536;
/// Default pipe-size override in bytes (0 leaves the OS default)
pub const DEFAULT_PIPE_SIZE: usize = 0;
/// Default maximum concurrent client connections
pub const DEFAULT_MAX_CLIENTS: usize = 1024;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listeners to bind; each carries its own header and backlog
    pub listeners: Vec<ListenerSpec>,

    /// Where the byte stream comes from
    pub upstream: UpstreamSpec,

    /// Ring buffer capacity in bytes
    pub ring_size: usize,

    /// Upper bound for a single upstream read
    pub read_chunk: usize,

    /// Pipe size applied to stdin upstreams (0 = leave the OS default)
    pub pipe_size: usize,

    /// Maximum concurrent client connections
    pub max_clients: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listeners: vec![DEFAULT_BIND.parse().expect("default bind spec parses")],
            upstream: UpstreamSpec::Stdin,
            ring_size: DEFAULT_RING_SIZE,
            read_chunk: DEFAULT_READ_CHUNK,
            pipe_size: DEFAULT_PIPE_SIZE,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl RelayConfig {
    /// Replace the listener set
    pub fn listeners(mut self, listeners: Vec<ListenerSpec>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Add a listener
    pub fn listener(mut self, listener: ListenerSpec) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Set the upstream source
    pub fn upstream(mut self, upstream: UpstreamSpec) -> Self {
        self.upstream = upstream;
        self
    }

    /// Set the ring buffer capacity
    pub fn ring_size(mut self, bytes: usize) -> Self {
        self.ring_size = bytes;
        self
    }

    /// Set the upstream read chunk size
    pub fn read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes;
        self
    }

    /// Set the stdin pipe-size override (0 disables)
    pub fn pipe_size(mut self, bytes: usize) -> Self {
        self.pipe_size = bytes;
        self
    }

    /// Set the maximum concurrent client connections
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Check buffer sizing and limits.
    ///
    /// Violations are fatal configuration errors, not runtime conditions:
    /// the ring's contiguous-append trick requires every read to fit the
    /// ring, and the registry is sized once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.read_chunk == 0 {
            return Err(Error::InvalidConfig("read chunk must be non-zero".into()));
        }
        if self.read_chunk > self.ring_size {
            return Err(Error::InvalidConfig(format!(
                "read chunk ({}) exceeds ring size ({})",
                self.read_chunk, self.ring_size
            )));
        }
        if self.max_clients == 0 {
            return Err(Error::InvalidConfig(
                "connection limit must be non-zero".into(),
            ));
        }
        if self.listeners.is_empty() {
            return Err(Error::InvalidConfig("at least one listener required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.ring_size, DEFAULT_RING_SIZE);
        assert_eq!(config.read_chunk, DEFAULT_READ_CHUNK);
        assert_eq!(config.pipe_size, DEFAULT_PIPE_SIZE);
        assert_eq!(config.max_clients, DEFAULT_MAX_CLIENTS);
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].port, 8080);
        assert!(config.listeners[0].header.is_empty());
        assert_eq!(config.listeners[0].backlog, 0);
        assert!(matches!(config.upstream, UpstreamSpec::Stdin));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .ring_size(1 << 20)
            .read_chunk(4096)
            .pipe_size(0)
            .max_clients(16)
            .upstream("tcp://example.com:9000".parse().unwrap());

        assert_eq!(config.ring_size, 1 << 20);
        assert_eq!(config.read_chunk, 4096);
        assert_eq!(config.pipe_size, 0);
        assert_eq!(config.max_clients, 16);
        assert!(matches!(config.upstream, UpstreamSpec::Tcp { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let config = RelayConfig::default().read_chunk(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_chunk_larger_than_ring() {
        let config = RelayConfig::default().ring_size(1024).read_chunk(4096);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_clients() {
        let config = RelayConfig::default().max_clients(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_listeners() {
        let config = RelayConfig::default().listeners(Vec::new());
        assert!(config.validate().is_err());
    }
}
