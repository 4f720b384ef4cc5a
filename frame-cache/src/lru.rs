//! Bounded, access-ordered cache of one video's frames.
//!
//! ## Architecture
//!
//! - **Storage**: `LinkedHashMap<u32, Bytes>` keyed by frame index, kept in
//!   access order (front = least recently used, back = most recently used)
//! - **Eviction**: strict LRU; an insert that overflows the capacity evicts
//!   the front entry, never the entry just inserted
//! - **Statistics**: lookups, hits, misses, inserts and evictions
//!
//! Every operation is O(1). `VideoCache` is NOT thread-safe by itself; the
//! [`CacheRegistry`](crate::CacheRegistry) wraps each instance in a mutex.
//!
//! ## Usage
//!
//! ```rust
//! use bytes::Bytes;
//! use frame_cache::VideoCache;
//!
//! let mut cache = VideoCache::new(2);
//! cache.put(0, Bytes::from_static(b"frame 0"));
//! cache.put(1, Bytes::from_static(b"frame 1"));
//!
//! // Touch 0 so that 1 becomes least recently used.
//! assert!(cache.get(0).is_some());
//! assert_eq!(cache.put(2, Bytes::from_static(b"frame 2")), Some(1));
//! ```

use bytes::Bytes;
use linked_hash_map::LinkedHashMap;

/// Default number of frames kept per video.
pub const DEFAULT_CAPACITY: usize = 500;

/// Access counters for one video cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheCounters {
    /// Calls to [`VideoCache::get`].
    pub lookups: u64,
    /// Lookups that found the frame.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
    /// Calls to [`VideoCache::put`].
    pub inserts: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}

impl CacheCounters {
    /// Hit rate in percent (0.0 when nothing was looked up).
    pub fn hit_rate(&self) -> f64 {
        frame_common::hit_rate(self.hits, self.misses)
    }
}

/// LRU cache of one video's frames.
#[derive(Debug)]
pub struct VideoCache {
    entries: LinkedHashMap<u32, Bytes>,
    capacity: usize,
    counters: CacheCounters,
}

impl VideoCache {
    /// Create an empty cache holding at most `capacity` frames.
    ///
    /// A capacity of 0 is raised to 1 so that the most recent insert is
    /// always retrievable.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LinkedHashMap::new(),
            capacity: capacity.max(1),
            counters: CacheCounters::default(),
        }
    }

    /// Look up a frame, promoting it to most recently used on a hit.
    pub fn get(&mut self, index: u32) -> Option<Bytes> {
        self.counters.lookups += 1;
        match self.entries.get_refresh(&index) {
            Some(frame) => {
                self.counters.hits += 1;
                Some(frame.clone())
            }
            None => {
                self.counters.misses += 1;
                None
            }
        }
    }

    /// Look up a frame without touching access order or counters.
    pub fn peek(&self, index: u32) -> Option<&Bytes> {
        self.entries.get(&index)
    }

    /// Returns true if the frame is cached. Does not touch access order.
    pub fn contains(&self, index: u32) -> bool {
        self.entries.contains_key(&index)
    }

    /// Insert or overwrite a frame, making it most recently used.
    ///
    /// Returns the index of the evicted frame, if the insert overflowed.
    pub fn put(&mut self, index: u32, frame: Bytes) -> Option<u32> {
        self.counters.inserts += 1;
        self.entries.insert(index, frame);

        let mut evicted = None;
        while self.entries.len() > self.capacity {
            if let Some((victim, _)) = self.entries.pop_front() {
                self.counters.evictions += 1;
                evicted = Some(victim);
            }
        }
        evicted
    }

    /// Index of the least recently used frame.
    pub fn lru_index(&self) -> Option<u32> {
        self.entries.front().map(|(index, _)| *index)
    }

    /// Cached indices from least to most recently used.
    pub fn indices(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Number of cached frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no frame is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total payload bytes held.
    pub fn payload_bytes(&self) -> usize {
        self.entries.values().map(Bytes::len).sum()
    }

    /// Access counters.
    pub fn counters(&self) -> CacheCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn frame(index: u32) -> Bytes {
        Bytes::from(index.to_be_bytes().to_vec())
    }

    #[test]
    fn evicts_least_recently_inserted() {
        let mut cache = VideoCache::new(3);
        for i in 0..3 {
            assert_eq!(cache.put(i, frame(i)), None);
        }
        assert_eq!(cache.put(3, frame(3)), Some(0));
        assert_eq!(cache.indices(), vec![1, 2, 3]);
    }

    #[test]
    fn get_promotes_entry() {
        let mut cache = VideoCache::new(3);
        for i in 0..3 {
            cache.put(i, frame(i));
        }
        assert_eq!(cache.get(0), Some(frame(0)));
        assert_eq!(cache.lru_index(), Some(1));
        assert_eq!(cache.put(3, frame(3)), Some(1));
        assert!(cache.contains(0));
    }

    #[test]
    fn peek_does_not_promote() {
        let mut cache = VideoCache::new(2);
        cache.put(0, frame(0));
        cache.put(1, frame(1));
        assert!(cache.peek(0).is_some());
        assert_eq!(cache.put(2, frame(2)), Some(0));
    }

    #[test]
    fn overwrite_refreshes_without_growing() {
        let mut cache = VideoCache::new(2);
        cache.put(0, frame(0));
        cache.put(1, frame(1));
        assert_eq!(cache.put(0, Bytes::from_static(b"new")), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lru_index(), Some(1));
        assert_eq!(cache.get(0), Some(Bytes::from_static(b"new")));
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let mut cache = VideoCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(5, frame(5));
        assert_eq!(cache.put(6, frame(6)), Some(5));
        assert_eq!(cache.get(6), Some(frame(6)));
    }

    #[test]
    fn counters_track_accesses() {
        let mut cache = VideoCache::new(1);
        assert!(cache.get(0).is_none());
        cache.put(0, frame(0));
        assert!(cache.get(0).is_some());
        cache.put(1, frame(1));

        let counters = cache.counters();
        assert_eq!(counters.lookups, 2);
        assert_eq!(counters.hits, 1);
        assert_eq!(counters.misses, 1);
        assert_eq!(counters.inserts, 2);
        assert_eq!(counters.evictions, 1);
        assert!((counters.hit_rate() - 50.0).abs() < 1e-9);
        assert_eq!(cache.payload_bytes(), 4);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Get(u32),
        Put(u32),
    }

    fn arbitrary_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..24).prop_map(Op::Get),
            (0u32..24).prop_map(Op::Put),
        ]
    }

    proptest! {
        /// Size never exceeds capacity and the victim is always the least
        /// recently accessed key, checked against a simple vector model.
        #[test]
        fn matches_reference_model(
            capacity in 1usize..12,
            ops in prop::collection::vec(arbitrary_op(), 0..200),
        ) {
            let mut cache = VideoCache::new(capacity);
            // Model: front = least recently used.
            let mut model: Vec<u32> = Vec::new();

            for op in ops {
                match op {
                    Op::Get(i) => {
                        let hit = cache.get(i).is_some();
                        let pos = model.iter().position(|&k| k == i);
                        prop_assert_eq!(hit, pos.is_some());
                        if let Some(pos) = pos {
                            let k = model.remove(pos);
                            model.push(k);
                        }
                    }
                    Op::Put(i) => {
                        if let Some(pos) = model.iter().position(|&k| k == i) {
                            model.remove(pos);
                        }
                        model.push(i);
                        let expected_victim = if model.len() > capacity {
                            Some(model.remove(0))
                        } else {
                            None
                        };
                        prop_assert_eq!(cache.put(i, frame(i)), expected_victim);
                        prop_assert_eq!(cache.peek(i), Some(&frame(i)));
                    }
                }
                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.indices(), model.clone());
            }
        }
    }
}
