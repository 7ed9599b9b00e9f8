//! LRU (Least Recently Used) replacement policy.
//!
//! Each occupied frame carries an age: the number of accesses to other
//! frames since it was last touched. Accessing a frame resets its age and
//! ages every other occupied frame; the victim is the oldest frame.
//!
//! Both operations are O(capacity), which is fine for the pool sizes used
//! here and keeps the policy state a single vector.

use super::EvictionPolicy;
use crate::common::FrameId;

/// Counter-based LRU over a fixed number of frames.
///
/// # Example
/// ```
/// use heapstore::buffer::replacer::{EvictionPolicy, LruReplacer};
/// use heapstore::FrameId;
///
/// let mut lru = LruReplacer::new(3);
/// lru.access(FrameId::new(0));
/// lru.access(FrameId::new(1));
/// lru.access(FrameId::new(0));
/// assert_eq!(lru.evict(), Some(FrameId::new(1)));
/// ```
#[derive(Debug)]
pub struct LruReplacer {
    /// Age per frame index; `None` for frames not tracked.
    ages: Vec<Option<u64>>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ages: vec![None; capacity],
        }
    }

    /// Number of tracked frames.
    pub fn size(&self) -> usize {
        self.ages.iter().filter(|age| age.is_some()).count()
    }
}

impl EvictionPolicy for LruReplacer {
    /// # Panics
    /// Panics if `frame_id` is not below the capacity.
    fn access(&mut self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.ages.len(),
            "{} out of range for LRU of capacity {}",
            frame_id,
            self.ages.len()
        );
        for (index, age) in self.ages.iter_mut().enumerate() {
            if index == frame_id.index() {
                *age = Some(0);
            } else if let Some(age) = age {
                *age += 1;
            }
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        // max_by_key keeps the last maximum; scan in reverse so ties go to
        // the lowest index.
        let (index, _) = self
            .ages
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(index, age)| age.map(|age| (index, age)))
            .max_by_key(|&(_, age)| age)?;
        self.ages[index] = None;
        Some(FrameId::new(index))
    }

    fn reset(&mut self) {
        self.ages.fill(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut lru = LruReplacer::new(4);
        for i in 0..4 {
            lru.access(FrameId::new(i));
        }
        lru.access(FrameId::new(0));
        lru.access(FrameId::new(2));

        assert_eq!(lru.evict(), Some(FrameId::new(1)));
        assert_eq!(lru.evict(), Some(FrameId::new(3)));
        assert_eq!(lru.evict(), Some(FrameId::new(0)));
        assert_eq!(lru.evict(), Some(FrameId::new(2)));
        assert_eq!(lru.evict(), None);
    }

    #[test]
    fn test_lru_empty() {
        let mut lru = LruReplacer::new(8);
        assert_eq!(lru.evict(), None);
        assert_eq!(lru.size(), 0);
    }

    #[test]
    fn test_evict_leaves_other_frames_unchanged() {
        let mut lru = LruReplacer::new(3);
        lru.access(FrameId::new(0));
        lru.access(FrameId::new(1));
        lru.access(FrameId::new(2));
        let before = lru.ages.clone();

        assert_eq!(lru.evict(), Some(FrameId::new(0)));
        assert_eq!(lru.ages[1], before[1]);
        assert_eq!(lru.ages[2], before[2]);
        assert_eq!(lru.size(), 2);
    }

    #[test]
    fn test_tie_breaks_to_lowest_index() {
        let mut lru = LruReplacer::new(3);
        lru.ages = vec![Some(5), None, Some(5)];
        assert_eq!(lru.evict(), Some(FrameId::new(0)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_access_out_of_range() {
        LruReplacer::new(2).access(FrameId::new(2));
    }

    proptest! {
        /// The victim is always the frame whose last access is oldest,
        /// checked against a plain recency list.
        #[test]
        fn prop_matches_reference_model(
            ops in proptest::collection::vec(prop_oneof![
                (0usize..6).prop_map(Some),
                Just(None),
            ], 1..200)
        ) {
            let mut lru = LruReplacer::new(6);
            // Front = least recently used
            let mut model: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    Some(frame) => {
                        lru.access(FrameId::new(frame));
                        model.retain(|&f| f != frame);
                        model.push(frame);
                    }
                    None => {
                        let expected = if model.is_empty() {
                            None
                        } else {
                            Some(FrameId::new(model.remove(0)))
                        };
                        prop_assert_eq!(lru.evict(), expected);
                    }
                }
            }
        }
    }
}
