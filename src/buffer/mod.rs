//! Circular byte buffer shared by the upstream reader and every client
//!
//! The buffer holds the most recent window of upstream data. The upstream
//! reader is its only writer; clients read from it at independent positions
//! and never mutate it. Single-task ownership makes it race-free without
//! locks.

mod ring;

pub use ring::{Pending, RingBuffer};
