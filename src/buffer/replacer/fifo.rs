//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use super::EvictionPolicy;
use crate::common::FrameId;

/// Evicts frames in the order they were first accessed.
///
/// Re-accessing a queued frame does not move it.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Queue of frame IDs in insertion order (front = oldest).
    queue: VecDeque<FrameId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<FrameId>,
}

impl FifoReplacer {
    /// Create a new FIFO replacer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked frames.
    pub fn size(&self) -> usize {
        self.queue.len()
    }
}

impl EvictionPolicy for FifoReplacer {
    fn access(&mut self, frame_id: FrameId) {
        if self.in_queue.insert(frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        let frame_id = self.queue.pop_front()?;
        self.in_queue.remove(&frame_id);
        Some(frame_id)
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.in_queue.clear();
    }
}
