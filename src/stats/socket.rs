//! TCP socket introspection
//!
//! Close lines include the kernel's total-retransmission counter for the
//! connection, read via `getsockopt(IPPROTO_TCP, TCP_INFO)`. The counter is
//! Linux-only; elsewhere (and on readout failure) it is reported as unknown.

#[cfg(target_os = "linux")]
use std::os::fd::AsRawFd;

/// Total TCP retransmissions on the socket, if the kernel exposes them
#[cfg(target_os = "linux")]
pub fn tcp_retransmissions<S: AsRawFd>(socket: &S) -> Option<u32> {
    let mut info: libc::tcp_info = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::tcp_info>() as libc::socklen_t;

    let rc = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_INFO,
            std::ptr::addr_of_mut!(info).cast(),
            &mut len,
        )
    };

    (rc == 0).then(|| info.tcpi_total_retrans)
}

/// Total TCP retransmissions on the socket, if the kernel exposes them
#[cfg(not(target_os = "linux"))]
pub fn tcp_retransmissions<S>(_socket: &S) -> Option<u32> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readout_on_live_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let _server = listener.accept().await.unwrap();

        // A freshly connected loopback socket has retransmitted nothing.
        assert_eq!(tcp_retransmissions(&client), Some(0));
    }
}
