//! Listener and upstream spec strings
//!
//! A listener spec is `<host>:<port>[,<header>[,<backlog-bytes>]]`. The host
//! part is split at the LAST colon so bare IPv6 literals work (`:::8080` is
//! the v6 wildcard on port 8080). The header has its escape sequences
//! decoded before it is ever sent.
//!
//! An upstream spec is `tcp://<host>:<port>`; the stdin upstream has no
//! string form (it is the absence of a spec).

use std::str::FromStr;

use bytes::Bytes;

use crate::error::Error;

/// One listener to bind: address plus per-listener greeting and backlog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    /// Host part; empty means the wildcard address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Greeting sent to every accepted client, escape sequences decoded
    pub header: Bytes,
    /// Most-recently-produced bytes replayed to a new client before live data
    pub backlog: u64,
}

impl ListenerSpec {
    /// Address string suitable for `ToSocketAddrs`
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() { "::" } else { &self.host };
        if host.contains(':') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

impl FromStr for ListenerSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ',');
        let addr = parts.next().unwrap_or_default();
        let header = parts.next().unwrap_or_default();
        let backlog = match parts.next() {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| Error::InvalidListenerSpec(s.to_string()))?,
            None => 0,
        };

        let (host, port) = split_host_port(addr)
            .ok_or_else(|| Error::InvalidListenerSpec(s.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port,
            header: unescape(header),
            backlog,
        })
    }
}

/// Where the relayed byte stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamSpec {
    /// Read from the process's standard input / pipe
    Stdin,
    /// Connect to a TCP endpoint
    Tcp { host: String, port: u16 },
}

impl UpstreamSpec {
    /// Address string suitable for `ToSocketAddrs`; `None` for stdin
    pub fn connect_addr(&self) -> Option<String> {
        match self {
            UpstreamSpec::Stdin => None,
            UpstreamSpec::Tcp { host, port } => {
                if host.contains(':') {
                    Some(format!("[{}]:{}", host, port))
                } else {
                    Some(format!("{}:{}", host, port))
                }
            }
        }
    }
}

impl FromStr for UpstreamSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("tcp://")
            .ok_or_else(|| Error::InvalidUpstreamSpec(s.to_string()))?;
        let (host, port) = split_host_port(rest)
            .ok_or_else(|| Error::InvalidUpstreamSpec(s.to_string()))?;
        if host.is_empty() {
            return Err(Error::InvalidUpstreamSpec(s.to_string()));
        }
        Ok(UpstreamSpec::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

/// Split `host:port` at the last colon. Returns `None` if there is no colon
/// or the port does not parse.
fn split_host_port(s: &str) -> Option<(&str, u16)> {
    let idx = s.rfind(':')?;
    let port = s[idx + 1..].parse::<u16>().ok()?;
    Some((&s[..idx], port))
}

/// Decode C-style escape sequences in header text.
///
/// Recognizes `\n \t \r \b \f \\ \" \' \0`; any other escaped character is
/// kept as-is, and a trailing backslash is kept literally.
pub fn unescape(s: &str) -> Bytes {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('b') => out.push(0x08),
            Some('f') => out.push(0x0C),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('\'') => out.push(b'\''),
            Some('0') => out.push(0),
            Some(other) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }

    Bytes::from(out)
}
