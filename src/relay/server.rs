//! The relay event loop
//!
//! Single task, readiness-driven. Each wake is classified into a tagged
//! event — shutdown, upstream readable, a listener acceptable, or a client
//! ready — and dispatched with full ownership of the ring and registry.
//! Nothing in here blocks: socket I/O uses `try_write`/`try_read` and the
//! loop parks only in the readiness select.

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};

use crate::buffer::RingBuffer;
use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::stats::RelaySummary;
use crate::upstream::Upstream;

use super::client::{ClientConn, PeerAddr, Progress};
use super::registry::{ClientRegistry, Token};

/// One bound listener with its per-listener greeting and backlog
#[derive(Debug)]
struct BoundListener {
    socket: TcpListener,
    local_addr: SocketAddr,
    header: Bytes,
    backlog: u64,
}

/// What a readiness wake was about
#[derive(Debug)]
enum Event {
    Shutdown,
    Upstream(io::Result<usize>),
    Accepted(usize, io::Result<(TcpStream, SocketAddr)>),
    Client(Token, Readiness),
}

#[derive(Debug, Clone, Copy)]
enum Readiness {
    /// Socket buffer space freed up for an armed client
    Writable,
    /// The client sent something, or hung up
    Readable,
}

/// The broadcast relay: one upstream fanned out to every connected client
#[derive(Debug)]
pub struct RelayServer {
    listeners: Vec<BoundListener>,
    registry: ClientRegistry,
    ring: RingBuffer,
    read_chunk: usize,
}

impl RelayServer {
    /// Bind every configured listener and allocate the ring.
    ///
    /// Any bind failure is fatal; the relay never runs with a partial
    /// listener set.
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        config.validate()?;

        let mut listeners = Vec::with_capacity(config.listeners.len());
        for spec in &config.listeners {
            let addr = spec.bind_addr();
            let socket = TcpListener::bind(&addr)
                .await
                .map_err(|source| Error::Bind {
                    spec: addr.clone(),
                    source,
                })?;
            let local_addr = socket.local_addr()?;
            tracing::info!(
                addr = %local_addr,
                backlog = spec.backlog,
                header_len = spec.header.len(),
                "Listening"
            );
            listeners.push(BoundListener {
                socket,
                local_addr,
                header: spec.header.clone(),
                backlog: spec.backlog,
            });
        }

        Ok(Self {
            listeners,
            registry: ClientRegistry::new(config.max_clients),
            ring: RingBuffer::new(config.ring_size, config.read_chunk),
            read_chunk: config.read_chunk,
        })
    }

    /// Addresses the listeners actually bound to (useful with port 0)
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(|l| l.local_addr).collect()
    }

    /// Run until the upstream ends or fails
    pub async fn run(&mut self, upstream: Upstream) -> Result<RelaySummary> {
        self.run_until(upstream, std::future::pending::<()>()).await
    }

    /// Run until `shutdown` completes, the upstream ends, or it fails.
    ///
    /// On orderly shutdown every open client gets a close-stats line and the
    /// aggregate summary is returned; upstream loss returns the error after
    /// the same drain.
    pub async fn run_until<F>(&mut self, mut upstream: Upstream, shutdown: F) -> Result<RelaySummary>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut chunk = vec![0u8; self.read_chunk];

        let outcome = loop {
            let event = {
                let listeners = &self.listeners;
                let registry = &self.registry;
                tokio::select! {
                    _ = &mut shutdown => Event::Shutdown,
                    res = upstream.recv(&mut chunk) => Event::Upstream(res),
                    (idx, res) = poll_fn(|cx| poll_accept_any(listeners, cx)) => {
                        Event::Accepted(idx, res)
                    }
                    (token, readiness) = poll_fn(|cx| poll_clients(registry, cx)),
                        if !registry.is_empty() =>
                    {
                        Event::Client(token, readiness)
                    }
                }
            };

            match event {
                Event::Shutdown => {
                    tracing::info!("Shutdown signal received");
                    break Ok(());
                }
                Event::Upstream(Ok(0)) => break Err(Error::UpstreamClosed),
                Event::Upstream(Err(e)) => break Err(Error::UpstreamRead(e)),
                Event::Upstream(Ok(n)) => self.pump(&chunk[..n]),
                Event::Accepted(idx, Ok((stream, addr))) => self.admit(idx, stream, addr),
                Event::Accepted(_, Err(e)) => {
                    // Transient accept failures (e.g. fd exhaustion) leave
                    // the listener in place.
                    tracing::error!(error = %e, "Failed to accept connection");
                }
                Event::Client(token, Readiness::Writable) => self.serve_one(token),
                Event::Client(token, Readiness::Readable) => self.check_incoming(token),
            }
        };

        for token in self.registry.tokens() {
            if let Some(conn) = self.registry.remove(token) {
                conn.log_close();
            }
        }

        let summary = RelaySummary {
            upstream_bytes: self.ring.total_written(),
            clients_served: self.registry.total_admitted(),
        };
        tracing::info!(
            total_upstream_bytes = summary.upstream_bytes,
            clients_served = summary.clients_served,
            "Relay stopped"
        );

        outcome.map(|_| summary)
    }

    /// Append freshly read upstream bytes and push them to every client.
    ///
    /// Serving everyone immediately is the level-triggered re-arm: clients
    /// whose sockets block stay armed for edge-triggered write readiness,
    /// everyone else drains to the new write head right here.
    fn pump(&mut self, data: &[u8]) {
        self.ring.append(data);

        for token in self.registry.tokens() {
            self.serve_one(token);
        }
    }

    fn admit(&mut self, idx: usize, stream: TcpStream, addr: SocketAddr) {
        let peer = PeerAddr::from(addr);

        if self.registry.at_capacity() {
            tracing::warn!(peer = %peer, "Rejecting connection: connection limit reached");
            return;
        }

        let listener = &self.listeners[idx];
        tracing::info!(
            peer = %peer,
            listener = %listener.local_addr,
            "Received connection"
        );

        let mut conn = ClientConn::new(
            stream,
            peer,
            idx,
            listener.header.clone(),
            &self.ring,
            listener.backlog,
        );

        // Greeting and any backlog go out right away; a client that fails
        // during the initial send never enters the registry.
        if conn.serve(&self.ring) == Progress::Closed {
            conn.log_close();
            return;
        }

        if self.registry.try_insert(conn).is_none() {
            tracing::warn!(
                "Rejecting connection: connection limit reached"
            );
        }
    }

    fn serve_one(&mut self, token: Token) {
        let Some(conn) = self.registry.get_mut(token) else {
            return;
        };
        if conn.serve(&self.ring) == Progress::Closed {
            self.close(token);
        }
    }

    fn check_incoming(&mut self, token: Token) {
        let Some(conn) = self.registry.get_mut(token) else {
            return;
        };
        if !conn.drain_incoming() {
            self.close(token);
        }
    }

    fn close(&mut self, token: Token) {
        if let Some(conn) = self.registry.remove(token) {
            conn.log_close();
        }
    }
}

/// Poll all listeners for a pending connection.
///
/// One accept per wake: the listener stays ready while more connections are
/// queued, so the next loop iteration picks them up.
fn poll_accept_any(
    listeners: &[BoundListener],
    cx: &mut Context<'_>,
) -> Poll<(usize, io::Result<(TcpStream, SocketAddr)>)> {
    for (idx, listener) in listeners.iter().enumerate() {
        if let Poll::Ready(res) = listener.socket.poll_accept(cx) {
            return Poll::Ready((idx, res));
        }
    }
    Poll::Pending
}

/// Poll every client for the readiness it currently cares about.
///
/// Armed clients (blocked mid-send) are watched for writability; every
/// client is watched for readability, which is how hangups surface on a
/// connection that is otherwise idle. Readiness errors are reported as the
/// corresponding readiness so the handler's socket call surfaces the error.
fn poll_clients(registry: &ClientRegistry, cx: &mut Context<'_>) -> Poll<(Token, Readiness)> {
    for (token, conn) in registry.iter() {
        if conn.armed {
            if conn.stream.poll_write_ready(cx).is_ready() {
                return Poll::Ready((token, Readiness::Writable));
            }
        }
        if conn.stream.poll_read_ready(cx).is_ready() {
            return Poll::Ready((token, Readiness::Readable));
        }
    }
    Poll::Pending
}
