//! The relay core
//!
//! One task multiplexes the upstream source, every listener, and every
//! client socket. It owns the ring buffer and all per-client cursors, so
//! nothing here needs a lock: per-client failures are contained to that
//! client, and only upstream or bind-time failures can stop the relay.

mod client;
mod registry;
mod server;

pub use client::{ClientConn, PeerAddr, Progress};
pub use registry::{ClientRegistry, Token};
pub use server::RelayServer;
