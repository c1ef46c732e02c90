//! Bounded client registry
//!
//! Maps connection tokens to owned client state. The capacity is fixed at
//! configuration time: admission control is an explicit check against this
//! bound, and a full registry means immediate connection refusal rather
//! than growth.

use std::collections::HashMap;

use super::client::ClientConn;

/// Opaque identifier for an admitted client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// The set of active client connections
///
/// Invariant: an entry exists iff the socket is open and participating in
/// the event loop's readiness polling.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<Token, ClientConn>,
    max_clients: usize,
    next_token: u64,
    admitted: u64,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::with_capacity(max_clients.min(1024)),
            max_clients,
            next_token: 1,
            admitted: 0,
        }
    }

    /// Number of active clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// True if no more clients may be admitted
    pub fn at_capacity(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Total clients ever admitted
    pub fn total_admitted(&self) -> u64 {
        self.admitted
    }

    /// Admit a client. Returns `None` (and drops nothing — the caller keeps
    /// the connection) when the registry is full.
    pub fn try_insert(&mut self, conn: ClientConn) -> Option<Token> {
        if self.at_capacity() {
            return None;
        }
        let token = Token(self.next_token);
        self.next_token += 1;
        self.admitted += 1;
        self.clients.insert(token, conn);
        Some(token)
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut ClientConn> {
        self.clients.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<ClientConn> {
        self.clients.remove(&token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Token, &ClientConn)> {
        self.clients.iter().map(|(t, c)| (*t, c))
    }

    /// Snapshot of the active tokens, for iteration that mutates entries
    pub fn tokens(&self) -> Vec<Token> {
        self.clients.keys().copied().collect()
    }
}
