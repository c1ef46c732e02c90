//! End-to-end relay tests over real loopback sockets
//!
//! Each test drives the relay with an in-memory upstream (a duplex pipe)
//! and observes what TCP clients actually receive: greeting header first,
//! then the backlog window, then live bytes, with no gaps or duplicates.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use tailcast::{Error, ListenerSpec, RelayConfig, RelayServer, RelaySummary, Upstream};

const WAIT: Duration = Duration::from_secs(5);

fn listener(header: &str, backlog: u64) -> ListenerSpec {
    ListenerSpec {
        host: "127.0.0.1".to_string(),
        port: 0,
        header: Bytes::copy_from_slice(header.as_bytes()),
        backlog,
    }
}

struct Harness {
    addrs: Vec<SocketAddr>,
    feed: DuplexStream,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<tailcast::Result<RelaySummary>>,
}

impl Harness {
    async fn start(listeners: Vec<ListenerSpec>, max_clients: usize) -> Self {
        let config = RelayConfig::default()
            .listeners(listeners)
            .ring_size(1024)
            .read_chunk(256)
            .max_clients(max_clients);

        let mut server = RelayServer::bind(&config).await.expect("bind");
        let addrs = server.local_addrs();

        let (feed, source) = tokio::io::duplex(4096);
        let upstream = Upstream::from_reader(source);

        let (stop, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run_until(upstream, async {
                    let _ = stop_rx.await;
                })
                .await
        });

        Self {
            addrs,
            feed,
            stop,
            handle,
        }
    }

    async fn connect(&self, idx: usize) -> TcpStream {
        TcpStream::connect(self.addrs[idx]).await.expect("connect")
    }

    async fn produce(&mut self, bytes: &[u8]) {
        self.feed.write_all(bytes).await.expect("produce");
        settle().await;
    }

    async fn stop(self) -> tailcast::Result<RelaySummary> {
        let _ = self.stop.send(());
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("relay did not stop")
            .expect("relay task panicked")
    }
}

/// Let the single-threaded relay task process pending events.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn read_exact(sock: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(WAIT, sock.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

#[tokio::test]
async fn test_header_then_backlog_then_live() {
    let mut relay = Harness::start(vec![listener("hi\n", 4)], 8).await;
    relay.produce(b"0123456789").await;

    let mut client = relay.connect(0).await;
    assert_eq!(read_exact(&mut client, 7).await, b"hi\n6789");

    settle().await;
    relay.produce(b"ABC").await;
    assert_eq!(read_exact(&mut client, 3).await, b"ABC");

    let summary = relay.stop().await.expect("clean shutdown");
    assert_eq!(summary.upstream_bytes, 13);
    assert_eq!(summary.clients_served, 1);
}

#[tokio::test]
async fn test_backlog_zero_gets_only_live_bytes() {
    let mut relay = Harness::start(vec![listener("", 0)], 8).await;
    relay.produce(b"hello").await;

    let mut client = relay.connect(0).await;
    settle().await;
    relay.produce(b"world").await;

    // Nothing from before the connection, exactly the live bytes after it.
    assert_eq!(read_exact(&mut client, 5).await, b"world");

    let summary = relay.stop().await.expect("clean shutdown");
    assert_eq!(summary.upstream_bytes, 10);
}

#[tokio::test]
async fn test_backlog_larger_than_produced_replays_everything() {
    let mut relay = Harness::start(vec![listener("", 100)], 8).await;
    relay.produce(b"hello").await;

    let mut client = relay.connect(0).await;
    assert_eq!(read_exact(&mut client, 5).await, b"hello");

    relay.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_listeners_are_independent() {
    let mut relay = Harness::start(vec![listener("hello\n", 0), listener("", 100)], 8).await;
    relay.produce(b"12345").await;

    let mut greeted = relay.connect(0).await;
    let mut replayed = relay.connect(1).await;
    settle().await;

    // Listener 0: header only, no backlog.
    assert_eq!(read_exact(&mut greeted, 6).await, b"hello\n");
    let mut probe = [0u8; 1];
    assert!(
        tokio::time::timeout(Duration::from_millis(100), greeted.read(&mut probe))
            .await
            .is_err(),
        "backlog-0 client received pre-connection bytes"
    );

    // Listener 1: no header, full (available) backlog.
    assert_eq!(read_exact(&mut replayed, 5).await, b"12345");

    // Both observe live bytes in the same order.
    relay.produce(b"X").await;
    assert_eq!(read_exact(&mut greeted, 1).await, b"X");
    assert_eq!(read_exact(&mut replayed, 1).await, b"X");

    relay.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_connection_limit_refuses_without_disturbing_others() {
    let mut relay = Harness::start(vec![listener("", 0)], 1).await;

    let mut admitted = relay.connect(0).await;
    settle().await;

    let mut refused = relay.connect(0).await;
    settle().await;

    // The refused client sees an immediate close.
    let mut probe = [0u8; 1];
    let n = tokio::time::timeout(WAIT, refused.read(&mut probe))
        .await
        .expect("refused client read timed out")
        .expect("refused client read failed");
    assert_eq!(n, 0);

    // The admitted client still streams.
    relay.produce(b"live").await;
    assert_eq!(read_exact(&mut admitted, 4).await, b"live");

    let summary = relay.stop().await.expect("clean shutdown");
    assert_eq!(summary.clients_served, 1);
}

#[tokio::test]
async fn test_shutdown_drains_clients_and_reports_totals() {
    let mut relay = Harness::start(vec![listener("", 0)], 8).await;
    relay.produce(b"0123456789").await;

    let mut client = relay.connect(0).await;
    settle().await;

    let summary = relay.stop().await.expect("clean shutdown");
    assert_eq!(summary.upstream_bytes, 10);
    assert_eq!(summary.clients_served, 1);

    // The relay is gone; the client reads EOF once nothing is left.
    let mut rest = Vec::new();
    let n = tokio::time::timeout(WAIT, client.read_to_end(&mut rest))
        .await
        .expect("post-shutdown read timed out")
        .expect("post-shutdown read failed");
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_upstream_eof_is_fatal() {
    let relay = Harness::start(vec![listener("", 0)], 8).await;

    drop(relay.feed);
    let result = tokio::time::timeout(WAIT, relay.handle)
        .await
        .expect("relay did not notice upstream EOF")
        .expect("relay task panicked");

    assert!(matches!(result, Err(Error::UpstreamClosed)));
}

#[tokio::test]
async fn test_disconnected_client_is_dropped() {
    let mut relay = Harness::start(vec![listener("", 0)], 8).await;

    let client = relay.connect(0).await;
    settle().await;
    drop(client);
    settle().await;

    // The relay noticed the hangup; producing must not disturb anything.
    relay.produce(b"after").await;

    let mut fresh = relay.connect(0).await;
    settle().await;
    relay.produce(b"more").await;
    assert_eq!(read_exact(&mut fresh, 4).await, b"more");

    let summary = relay.stop().await.expect("clean shutdown");
    assert_eq!(summary.clients_served, 2);
}
