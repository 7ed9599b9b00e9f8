//! Buffer pool counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters bumped by the buffer pool.
///
/// Counters are independent atomics, bumped with `Ordering::Relaxed`
/// outside or inside a partition lock alike. A snapshot taken while other
/// threads work may mix values from slightly different moments.
///
/// # Example
/// ```
/// use heapstore::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.cache_misses.fetch_add(2, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().cache_misses, 2);
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Requests served from a resident frame.
    pub cache_hits: AtomicU64,

    /// Requests that had to go to disk.
    pub cache_misses: AtomicU64,

    /// Frames of the regular partition reused for another page.
    pub evictions: AtomicU64,

    /// Pages read from table files.
    pub pages_read: AtomicU64,

    /// Dirty pages written back (placeholders of new pages excluded).
    pub pages_written: AtomicU64,

    /// `LogManager::flush_page` calls made ahead of a write-back.
    pub log_flushes: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn counters(&self) -> [&AtomicU64; 6] {
        [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.pages_read,
            &self.pages_written,
            &self.log_flushes,
        ]
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let [cache_hits, cache_misses, evictions, pages_read, pages_written, log_flushes] =
            self.counters().map(|counter| counter.load(Ordering::Relaxed));
        StatsSnapshot {
            cache_hits,
            cache_misses,
            evictions,
            pages_read,
            pages_written,
            log_flushes,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Plain copy of [`BufferPoolStats`] at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub log_flushes: u64,
}

impl StatsSnapshot {
    /// Fraction of requests served without I/O; 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        match self.cache_hits + self.cache_misses {
            0 => 0.0,
            requests => self.cache_hits as f64 / requests as f64,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} ({:.1}% hit) evictions={} read={} written={} log_flushes={}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.pages_read,
            self.pages_written,
            self.log_flushes
        )
    }
}
