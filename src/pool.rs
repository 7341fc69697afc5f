//! Reusable byte buffers for readers and writers.
//!
//! The engine checks a buffer out for every operation and checks it back in
//! when the operation ends, so repeated calls reuse a handful of allocations
//! instead of growing a fresh buffer each time. A checked-out buffer is owned
//! exclusively by its borrower.

use parking_lot::Mutex;

/// Hit and miss counters of a [`BufferPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Checkouts served from an idle buffer.
    pub hits: u64,
    /// Checkouts that had to allocate.
    pub misses: u64,
    /// Buffers dropped on checkin because the pool was full.
    pub discarded: u64,
}

/// Bounded pool of `Vec<u8>` buffers.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    stats: Mutex<PoolStats>,
    max_idle: usize,
    buffer_size: usize,
}

impl BufferPool {
    /// Creates a pool keeping at most `max_idle` buffers, each allocated with
    /// `buffer_size` bytes of capacity.
    #[must_use]
    pub fn new(max_idle: usize, buffer_size: usize) -> Self {
        BufferPool {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            stats: Mutex::new(PoolStats::default()),
            max_idle,
            buffer_size,
        }
    }

    /// Takes an empty buffer, allocating one when none is idle.
    pub fn checkout(&self) -> Vec<u8> {
        let reused = self.idle.lock().pop();
        let mut stats = self.stats.lock();
        match reused {
            Some(buffer) => {
                stats.hits += 1;
                buffer
            }
            None => {
                stats.misses += 1;
                tracing::trace!(size = self.buffer_size, "buffer pool miss");
                Vec::with_capacity(self.buffer_size)
            }
        }
    }

    /// Returns a buffer. Its contents are cleared; it is dropped if the pool
    /// already holds `max_idle` buffers.
    pub fn checkin(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buffer);
        } else {
            drop(idle);
            self.stats.lock().discarded += 1;
        }
    }

    /// Number of buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(16, 4096)
    }
}
