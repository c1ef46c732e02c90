//! tailcast: single-upstream, many-subscriber TCP broadcast relay
//!
//! Reads a byte stream once — from stdin, a pipe, or a TCP upstream — and
//! fans it out unmodified to any number of TCP clients. Clients may join and
//! leave at any time; each listener can greet new clients with a header and
//! replay a configurable backlog of recent bytes before live data.
//!
//! The whole relay runs on one task: a ring buffer holds the most recent
//! window of upstream data, every client is a cursor into it, and a single
//! readiness loop multiplexes the upstream, the listeners, and all client
//! sockets with no locks and no per-client tasks.
//!
//! # Example
//!
//! ```no_run
//! use tailcast::{RelayConfig, RelayServer, Upstream};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), tailcast::Error> {
//!     let config = RelayConfig::default()
//!         .listeners(vec!["127.0.0.1:8080,hello\\n,4096".parse()?]);
//!
//!     let upstream = Upstream::open(&config.upstream, config.pipe_size).await?;
//!     let mut server = RelayServer::bind(&config).await?;
//!     let summary = server
//!         .run_until(upstream, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     eprintln!("relayed {} bytes", summary.upstream_bytes);
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod relay;
pub mod stats;
pub mod upstream;

pub use buffer::RingBuffer;
pub use config::{ListenerSpec, RelayConfig, UpstreamSpec};
pub use error::{Error, Result};
pub use relay::RelayServer;
pub use stats::RelaySummary;
pub use upstream::Upstream;
