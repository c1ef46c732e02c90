//! tailcast binary
//!
//! CLI glue around the relay: parse flags, open the upstream, bind the
//! listeners, and run until interrupted. Diagnostics go to stderr; the exit
//! code is non-zero on fatal configuration or upstream failure.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tailcast::config::{
    DEFAULT_MAX_CLIENTS, DEFAULT_PIPE_SIZE, DEFAULT_READ_CHUNK, DEFAULT_RING_SIZE,
};
use tailcast::{ListenerSpec, RelayConfig, RelayServer, RelaySummary, Result, Upstream, UpstreamSpec};

#[derive(Parser, Debug)]
#[command(
    name = "tailcast",
    version,
    about = "Broadcast one byte stream to many TCP clients, with replay backlog"
)]
struct Cli {
    /// Upstream data source, tcp://<host>:<port>; reads stdin when omitted
    #[arg(long, value_name = "SPEC")]
    upstream: Option<String>,

    /// Listener spec <host>:<port>[,<header>[,<backlog-bytes>]]; repeatable.
    /// Header escape sequences (\n, \t, ...) are decoded.
    #[arg(long = "listen", value_name = "SPEC")]
    listen: Vec<String>,

    /// Ring buffer size in bytes
    #[arg(long = "rbsize", value_name = "BYTES", default_value_t = DEFAULT_RING_SIZE)]
    rbsize: usize,

    /// Maximum number of concurrent client connections
    #[arg(long = "maxconn", value_name = "N", default_value_t = DEFAULT_MAX_CLIENTS)]
    maxconn: usize,

    /// Read buffer size for upstream reads, in bytes
    #[arg(long = "bsize", value_name = "BYTES", default_value_t = DEFAULT_READ_CHUNK)]
    bsize: usize,

    /// Override the pipe size if the upstream is stdin; 0 leaves the OS default
    #[arg(long = "psize", value_name = "BYTES", default_value_t = DEFAULT_PIPE_SIZE)]
    psize: usize,
}

impl Cli {
    fn into_config(self) -> Result<RelayConfig> {
        let mut config = RelayConfig::default()
            .ring_size(self.rbsize)
            .read_chunk(self.bsize)
            .pipe_size(self.psize)
            .max_clients(self.maxconn);

        if let Some(spec) = &self.upstream {
            config = config.upstream(spec.parse::<UpstreamSpec>()?);
        }
        if !self.listen.is_empty() {
            let listeners = self
                .listen
                .iter()
                .map(|s| s.parse::<ListenerSpec>())
                .collect::<Result<Vec<_>>>()?;
            config = config.listeners(listeners);
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run(cli: Cli) -> Result<RelaySummary> {
    let config = cli.into_config()?;

    let upstream = Upstream::open(&config.upstream, config.pipe_size).await?;
    let mut server = RelayServer::bind(&config).await?;

    server
        .run_until(upstream, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay failed");
            ExitCode::FAILURE
        }
    }
}
