//! Upstream source
//!
//! There is exactly one upstream per relay: the process's standard input
//! (usually a pipe) or a TCP connection opened before the event loop starts.
//! The relay drains it at full read speed; a closed or failing upstream is
//! fatal because the relay has nothing left to do without it.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;

use crate::config::UpstreamSpec;
use crate::error::{Error, Result};

/// The single source of the relayed byte stream
pub struct Upstream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl Upstream {
    /// Open the upstream described by `spec`.
    ///
    /// For the stdin upstream a non-zero `pipe_size` is applied with
    /// `F_SETPIPE_SZ` first; a failed override is a fatal startup error.
    pub async fn open(spec: &UpstreamSpec, pipe_size: usize) -> Result<Self> {
        match spec {
            UpstreamSpec::Stdin => {
                if pipe_size > 0 {
                    set_stdin_pipe_size(pipe_size)?;
                }
                tracing::info!("Reading upstream from stdin");
                Ok(Self::from_reader(tokio::io::stdin()))
            }
            UpstreamSpec::Tcp { .. } => {
                let addr = spec.connect_addr().expect("tcp spec has an address");
                let stream = TcpStream::connect(&addr)
                    .await
                    .map_err(|source| Error::UpstreamConnect {
                        spec: addr.clone(),
                        source,
                    })?;
                tracing::info!(addr = %addr, "Connected to TCP upstream");
                Ok(Self::from_reader(stream))
            }
        }
    }

    /// Wrap an arbitrary reader as the upstream
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
        }
    }

    /// One bounded read into `buf`. Returns the number of bytes read;
    /// `Ok(0)` means end of stream.
    pub async fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf).await
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream").finish_non_exhaustive()
    }
}

#[cfg(target_os = "linux")]
fn set_stdin_pipe_size(bytes: usize) -> Result<()> {
    let rc = unsafe { libc::fcntl(libc::STDIN_FILENO, libc::F_SETPIPE_SZ, bytes as libc::c_int) };
    if rc < 0 {
        return Err(Error::PipeSize(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_stdin_pipe_size(_bytes: usize) -> Result<()> {
    tracing::warn!("Pipe size override is not supported on this platform");
    Ok(())
}
