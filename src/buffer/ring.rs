//! Ring buffer implementation
//!
//! Positions handed to callers are monotonic stream offsets (total bytes
//! produced), not raw ring indices. All modulo and wraparound arithmetic
//! stays inside this type; callers only ever see safe slices.
//!
//! The storage is over-allocated by one maximum read chunk so a single
//! append always lands contiguously: a write that runs past the logical end
//! spills into the mirror region and the overflow is then copied back to
//! offset 0. The hot append path never splits a write.

/// The bytes pending between a reader's position and the write head.
///
/// `second` is empty unless the range wraps around the end of the ring.
/// Reading `first` then `second` yields the bytes in production order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pending<'a> {
    pub first: &'a [u8],
    pub second: &'a [u8],
}

impl Pending<'_> {
    /// Total number of pending bytes
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// True if the reader is caught up
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }
}

/// Fixed-capacity circular byte buffer with a contiguous-append mirror region
#[derive(Debug)]
pub struct RingBuffer {
    storage: Vec<u8>,
    capacity: usize,
    max_chunk: usize,
    total_written: u64,
}

impl RingBuffer {
    /// Create a buffer holding `capacity` bytes, accepting appends of up to
    /// `max_chunk` bytes.
    ///
    /// `RelayConfig::validate` guarantees `0 < max_chunk <= capacity`; this
    /// constructor asserts the same.
    pub fn new(capacity: usize, max_chunk: usize) -> Self {
        assert!(max_chunk > 0, "read chunk must be non-zero");
        assert!(
            max_chunk <= capacity,
            "read chunk must not exceed ring capacity"
        );
        Self {
            storage: vec![0u8; capacity + max_chunk],
            capacity,
            max_chunk,
            total_written: 0,
        }
    }

    /// Ring capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bytes produced by the upstream so far
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Current write index within the ring
    pub fn write_pos(&self) -> usize {
        (self.total_written % self.capacity as u64) as usize
    }

    /// Append `data` at the write head.
    ///
    /// The write lands contiguously; if it runs past the logical end the
    /// overflow is mirrored back to the front of the ring.
    pub fn append(&mut self, data: &[u8]) {
        assert!(
            data.len() <= self.max_chunk,
            "append larger than the configured read chunk"
        );

        let pos = self.write_pos();
        self.storage[pos..pos + data.len()].copy_from_slice(data);

        let end = pos + data.len();
        if end > self.capacity {
            let overflow = end - self.capacity;
            self.storage.copy_within(self.capacity..end, 0);
            debug_assert!(overflow <= self.max_chunk);
        }

        self.total_written += data.len() as u64;
    }

    /// Stream offset of the oldest byte still retained in the ring
    pub fn oldest_retained(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity as u64)
    }

    /// The bytes between stream offset `from` and the write head.
    ///
    /// A reader that has been lapped by the writer (its position is older
    /// than the retained window) is clamped forward to the oldest retained
    /// byte; it skips the overwritten gap rather than observing garbage.
    pub fn pending_from(&self, from: u64) -> Pending<'_> {
        debug_assert!(from <= self.total_written, "reader ahead of writer");

        let from = from.max(self.oldest_retained());
        let len = (self.total_written - from) as usize;
        if len == 0 {
            return Pending::default();
        }

        let start = (from % self.capacity as u64) as usize;
        let head = self.write_pos();
        if start < head && len == head - start {
            Pending {
                first: &self.storage[start..head],
                second: &[],
            }
        } else {
            // Wrapped (or a full window): tail of the ring, then the head.
            Pending {
                first: &self.storage[start..self.capacity],
                second: &self.storage[..head],
            }
        }
    }

    /// Seed position for a new reader on a listener with the given backlog.
    ///
    /// At most `min(total_written, backlog, capacity)` bytes of history are
    /// replayed; the ring cannot hand back more than it retains.
    pub fn start_for_backlog(&self, backlog: u64) -> u64 {
        let replay = backlog
            .min(self.total_written)
            .min(self.capacity as u64);
        self.total_written - replay
    }
}
