//! Connection and relay counters

use std::time::{Duration, Instant};

/// Per-connection statistics
///
/// `bytes_sent` counts everything written to the client: greeting header,
/// backlog replay, and live bytes.
#[derive(Debug, Clone)]
pub struct ClientStats {
    /// Total bytes written to the client socket
    pub bytes_sent: u64,
    /// When the connection was accepted
    pub connected_at: Instant,
}

impl ClientStats {
    pub fn new() -> Self {
        Self {
            bytes_sent: 0,
            connected_at: Instant::now(),
        }
    }

    /// Record a successful write of `n` bytes
    pub fn record_sent(&mut self, n: usize) {
        self.bytes_sent += n as u64;
    }

    /// How long the connection has been open
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate counters reported when the relay stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Total bytes read from the upstream over the relay's lifetime
    pub upstream_bytes: u64,
    /// Total client connections admitted over the relay's lifetime
    pub clients_served: u64,
}
