//! Per-client connection state and serving
//!
//! A client's lifetime is accept → streaming → closed. There is no stored
//! state field; a connection's state is implied by its registry membership
//! and whether it is armed for write readiness. The cursor is a monotonic
//! stream offset into the shared ring; all wraparound handling lives in the
//! ring itself.

use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use tokio::net::TcpStream;

use crate::buffer::RingBuffer;
use crate::stats::{tcp_retransmissions, ClientStats};

/// Printable peer address with IPv4-mapped IPv6 folded back to IPv4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        let host = match addr.ip() {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4.to_string(),
                None => v6.to_string(),
            },
            IpAddr::V4(v4) => v4.to_string(),
        };
        Self {
            host,
            port: addr.port(),
        }
    }
}

impl std::fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outcome of one serving pass over a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Everything pending was written; the client sits at the write head
    CaughtUp,
    /// The socket would block; the cursor keeps its partial advance and the
    /// client is armed for write readiness
    Blocked,
    /// The socket failed; the connection must be closed
    Closed,
}

/// One admitted client connection
#[derive(Debug)]
pub struct ClientConn {
    pub(crate) stream: TcpStream,
    pub(crate) peer: PeerAddr,
    /// Index of the listener that accepted this client
    pub(crate) listener: usize,
    /// Cursor: stream offset of the next byte to send
    position: u64,
    /// Stream offset where replay began, recorded at accept time
    replay_start: u64,
    /// Unsent remainder of the listener's greeting header
    pending_header: Bytes,
    pub(crate) stats: ClientStats,
    /// Waiting for write readiness after a would-block
    pub(crate) armed: bool,
}

impl ClientConn {
    /// Build the connection state for a just-accepted client.
    ///
    /// The cursor is seeded at the ring's write head, or up to `backlog`
    /// bytes behind it when the owning listener replays history.
    pub fn new(
        stream: TcpStream,
        peer: PeerAddr,
        listener: usize,
        header: Bytes,
        ring: &RingBuffer,
        backlog: u64,
    ) -> Self {
        let position = ring.start_for_backlog(backlog);
        Self {
            stream,
            peer,
            listener,
            position,
            replay_start: position,
            pending_header: header,
            stats: ClientStats::new(),
            armed: false,
        }
    }

    /// Stream offset of the next byte this client will receive
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Stream offset where this client's replay started
    pub fn replay_start(&self) -> u64 {
        self.replay_start
    }

    /// Write as much as the socket takes right now: first any unsent
    /// greeting bytes, then the ring range from the cursor to the write
    /// head. The wrap case falls out of the ring's two-slice view — each
    /// loop pass writes one contiguous slice and re-derives the rest.
    pub fn serve(&mut self, ring: &RingBuffer) -> Progress {
        while !self.pending_header.is_empty() {
            match self.stream.try_write(&self.pending_header) {
                Ok(0) => return Progress::Closed,
                Ok(n) => {
                    self.stats.record_sent(n);
                    let _ = self.pending_header.split_to(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    self.armed = true;
                    return Progress::Blocked;
                }
                Err(_) => return Progress::Closed,
            }
        }

        // A cursor lapped by the writer skips forward to the oldest byte
        // the ring still retains.
        self.position = self.position.max(ring.oldest_retained());

        loop {
            let pending = ring.pending_from(self.position);
            if pending.is_empty() {
                self.armed = false;
                return Progress::CaughtUp;
            }
            match self.stream.try_write(pending.first) {
                Ok(0) => return Progress::Closed,
                Ok(n) => {
                    self.position += n as u64;
                    self.stats.record_sent(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    self.armed = true;
                    return Progress::Blocked;
                }
                Err(_) => return Progress::Closed,
            }
        }
    }

    /// Drain and discard anything the client sent (the protocol is one-way).
    ///
    /// Returns `false` when the peer has closed or reset the connection.
    pub fn drain_incoming(&mut self) -> bool {
        let mut scratch = [0u8; 4096];
        loop {
            match self.stream.try_read(&mut scratch) {
                Ok(0) => return false,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return true,
                Err(_) => return false,
            }
        }
    }

    /// Emit the close summary: peer, bytes sent, TCP retransmissions.
    pub fn log_close(&self) {
        match tcp_retransmissions(&self.stream) {
            Some(retrans) => tracing::info!(
                peer = %self.peer,
                bytes_sent = self.stats.bytes_sent,
                tcp_retransmissions = retrans,
                "Closing connection"
            ),
            None => tracing::info!(
                peer = %self.peer,
                bytes_sent = self.stats.bytes_sent,
                tcp_retransmissions = "unknown",
                "Closing connection"
            ),
        }
    }
}
