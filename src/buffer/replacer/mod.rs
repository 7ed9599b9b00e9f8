//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`LruReplacer`] - Least Recently Used, via per-frame age counters
//! - [`FifoReplacer`] - First In, First Out
//!
//! The buffer pool holds a [`Replacer`], a closed enum over the policies
//! selected by [`ReplacerKind`] in the configuration.

mod fifo;
mod lru;

pub use fifo::FifoReplacer;
pub use lru::LruReplacer;

use crate::common::FrameId;

/// Interface every eviction policy implements.
///
/// Frame ids are indices into one buffer pool partition, so they are always
/// below the capacity the policy was created with.
pub trait EvictionPolicy {
    /// Record a touch of `frame_id` (on insertion and on every hit).
    fn access(&mut self, frame_id: FrameId);

    /// Pick a victim among the frames touched so far.
    ///
    /// The selected frame is forgotten until it is accessed again; no state
    /// of any other frame changes. Returns `None` if no frame is tracked.
    fn evict(&mut self) -> Option<FrameId>;

    /// Forget every frame.
    fn reset(&mut self);
}

/// Eviction policy selector used in [`StorageConfig`](crate::common::config::StorageConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacerKind {
    #[default]
    Lru,
    Fifo,
}

/// The eviction policy of one buffer pool partition.
#[derive(Debug)]
pub enum Replacer {
    Lru(LruReplacer),
    Fifo(FifoReplacer),
}

impl Replacer {
    /// Create the policy `kind` for a partition of `capacity` frames.
    pub fn new(kind: ReplacerKind, capacity: usize) -> Self {
        match kind {
            ReplacerKind::Lru => Replacer::Lru(LruReplacer::new(capacity)),
            ReplacerKind::Fifo => Replacer::Fifo(FifoReplacer::new()),
        }
    }

    pub fn kind(&self) -> ReplacerKind {
        match self {
            Replacer::Lru(_) => ReplacerKind::Lru,
            Replacer::Fifo(_) => ReplacerKind::Fifo,
        }
    }
}

impl EvictionPolicy for Replacer {
    fn access(&mut self, frame_id: FrameId) {
        match self {
            Replacer::Lru(r) => r.access(frame_id),
            Replacer::Fifo(r) => r.access(frame_id),
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        match self {
            Replacer::Lru(r) => r.evict(),
            Replacer::Fifo(r) => r.evict(),
        }
    }

    fn reset(&mut self) {
        match self {
            Replacer::Lru(r) => r.reset(),
            Replacer::Fifo(r) => r.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacer_dispatch() {
        for kind in [ReplacerKind::Lru, ReplacerKind::Fifo] {
            let mut replacer = Replacer::new(kind, 3);
            assert_eq!(replacer.kind(), kind);

            replacer.access(FrameId::new(0));
            replacer.access(FrameId::new(1));
            assert_eq!(replacer.evict(), Some(FrameId::new(0)));

            replacer.reset();
            assert_eq!(replacer.evict(), None);
        }
    }

    #[test]
    fn test_policies_differ_on_reaccess() {
        let mut lru = Replacer::new(ReplacerKind::Lru, 2);
        let mut fifo = Replacer::new(ReplacerKind::Fifo, 2);
        for r in [&mut lru, &mut fifo] {
            r.access(FrameId::new(0));
            r.access(FrameId::new(1));
            r.access(FrameId::new(0));
        }
        assert_eq!(lru.evict(), Some(FrameId::new(1)));
        assert_eq!(fifo.evict(), Some(FrameId::new(0)));
    }
}
