//! Statistics for relay connections
//!
//! Per-client byte counters reported on close, the aggregate summary emitted
//! at shutdown, and the TCP retransmission readout used in close lines.

mod metrics;
mod socket;

pub use metrics::{ClientStats, RelaySummary};
pub use socket::tcp_retransmissions;
