//! Relay error types
//!
//! Startup errors (bad specs, bind/connect failures, bad buffer sizing) and
//! the one fatal runtime error (upstream loss). Per-client send failures are
//! not represented here: they are contained to the connection and never
//! propagate out of the event loop.

use std::io;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug)]
pub enum Error {
    /// A listener spec string could not be parsed
    InvalidListenerSpec(String),
    /// An upstream spec string could not be parsed
    InvalidUpstreamSpec(String),
    /// Buffer sizing or connection limits failed validation
    InvalidConfig(String),
    /// Binding a listener address failed
    Bind { spec: String, source: io::Error },
    /// Connecting to a TCP upstream failed
    UpstreamConnect { spec: String, source: io::Error },
    /// Overriding the upstream pipe size failed
    PipeSize(io::Error),
    /// The upstream reached end of stream
    UpstreamClosed,
    /// Reading from the upstream failed
    UpstreamRead(io::Error),
    /// Other I/O error
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidListenerSpec(spec) => {
                write!(f, "invalid listener spec: {}", spec)
            }
            Error::InvalidUpstreamSpec(spec) => {
                write!(f, "invalid upstream spec: {}", spec)
            }
            Error::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Error::Bind { spec, source } => write!(f, "cannot bind {}: {}", spec, source),
            Error::UpstreamConnect { spec, source } => {
                write!(f, "cannot connect upstream {}: {}", spec, source)
            }
            Error::PipeSize(source) => write!(f, "cannot set pipe size: {}", source),
            Error::UpstreamClosed => write!(f, "upstream closed the stream"),
            Error::UpstreamRead(source) => write!(f, "upstream read failed: {}", source),
            Error::Io(source) => write!(f, "I/O error: {}", source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. }
            | Error::UpstreamConnect { source, .. }
            | Error::PipeSize(source)
            | Error::UpstreamRead(source)
            | Error::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_listener_spec() {
        let err = Error::InvalidListenerSpec("nonsense".to_string());
        assert_eq!(err.to_string(), "invalid listener spec: nonsense");
    }

    #[test]
    fn test_display_upstream_closed() {
        assert_eq!(
            Error::UpstreamClosed.to_string(),
            "upstream closed the stream"
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let err = Error::Bind {
            spec: ":::8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.source().is_some());
        assert!(Error::UpstreamClosed.source().is_none());
    }

    #[test]
    fn test_from_io() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
