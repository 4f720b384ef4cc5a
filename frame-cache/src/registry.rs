//! Shared map from video name to that video's cache.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::lru::{CacheCounters, VideoCache, DEFAULT_CAPACITY};

/// Point-in-time view of one video's cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoCacheStats {
    pub size: usize,
    pub capacity: usize,
    pub payload_bytes: usize,
    pub counters: CacheCounters,
}

/// Process-wide collection of per-video caches.
///
/// Caches are created on the first insert for a video name and live for the
/// rest of the process. Each video has its own lock, so traffic on one video
/// never waits on another, and evictions in one video never touch another.
#[derive(Debug)]
pub struct CacheRegistry {
    capacity: usize,
    videos: RwLock<HashMap<String, Arc<Mutex<VideoCache>>>>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CacheRegistry {
    /// Create an empty registry whose caches each hold `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            videos: RwLock::new(HashMap::new()),
        }
    }

    /// Per-video capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn existing(&self, video: &str) -> Option<Arc<Mutex<VideoCache>>> {
        self.videos.read().get(video).cloned()
    }

    fn get_or_create(&self, video: &str) -> Arc<Mutex<VideoCache>> {
        if let Some(cache) = self.existing(video) {
            return cache;
        }
        let mut videos = self.videos.write();
        videos
            .entry(video.to_string())
            .or_insert_with(|| {
                info!("Created new cache for video {} (capacity {})", video, self.capacity);
                Arc::new(Mutex::new(VideoCache::new(self.capacity)))
            })
            .clone()
    }

    /// Look up a frame, promoting it on a hit.
    ///
    /// Returns `None` for videos that have never had a frame stored.
    pub fn get(&self, video: &str, index: u32) -> Option<Bytes> {
        let cache = self.existing(video)?;
        let frame = cache.lock().get(index);
        frame
    }

    /// Store a frame, creating the video's cache if needed.
    ///
    /// Returns the index evicted to make room, if any.
    pub fn put(&self, video: &str, index: u32, frame: Bytes) -> Option<u32> {
        let cache = self.get_or_create(video);
        let evicted = cache.lock().put(index, frame);
        if let Some(victim) = evicted {
            debug!("Evicted {}#{} from cache", video, victim);
        }
        evicted
    }

    /// Number of frames cached for `video` (0 if it has no cache).
    pub fn size(&self, video: &str) -> usize {
        self.existing(video).map(|c| c.lock().len()).unwrap_or(0)
    }

    /// Detailed statistics for one video, if it has a cache.
    pub fn stats(&self, video: &str) -> Option<VideoCacheStats> {
        let cache = self.existing(video)?;
        let cache = cache.lock();
        Some(VideoCacheStats {
            size: cache.len(),
            capacity: cache.capacity(),
            payload_bytes: cache.payload_bytes(),
            counters: cache.counters(),
        })
    }

    /// All cached videos with their current sizes, sorted by name.
    pub fn videos(&self) -> Vec<(String, usize)> {
        let entries: Vec<(String, Arc<Mutex<VideoCache>>)> = self
            .videos
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), Arc::clone(cache)))
            .collect();
        let mut sizes: Vec<(String, usize)> = entries
            .into_iter()
            .map(|(name, cache)| {
                let size = cache.lock().len();
                (name, size)
            })
            .collect();
        sizes.sort_by(|a, b| a.0.cmp(&b.0));
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn frame(tag: &str, index: u32) -> Bytes {
        Bytes::from(format!("{tag}-{index}"))
    }

    #[test]
    fn get_on_unknown_video_creates_nothing() {
        let registry = CacheRegistry::new(4);
        assert!(registry.get("Bunny", 0).is_none());
        assert!(registry.videos().is_empty());
        assert!(registry.stats("Bunny").is_none());
    }

    #[test]
    fn put_then_get_returns_same_bytes() {
        let registry = CacheRegistry::new(4);
        registry.put("Bunny", 7, frame("Bunny", 7));
        assert_eq!(registry.get("Bunny", 7), Some(frame("Bunny", 7)));
        assert_eq!(registry.size("Bunny"), 1);
    }

    #[test]
    fn videos_do_not_share_capacity() {
        let registry = CacheRegistry::new(2);
        registry.put("A", 0, frame("A", 0));
        registry.put("A", 1, frame("A", 1));
        for i in 0..10 {
            registry.put("B", i, frame("B", i));
        }
        assert_eq!(registry.get("A", 0), Some(frame("A", 0)));
        assert_eq!(registry.get("A", 1), Some(frame("A", 1)));
        assert_eq!(registry.videos(), vec![("A".to_string(), 2), ("B".to_string(), 2)]);
    }

    #[test]
    fn stats_reflect_counters() {
        let registry = CacheRegistry::new(1);
        registry.put("V", 0, frame("V", 0));
        registry.put("V", 1, frame("V", 1));
        assert!(registry.get("V", 0).is_none());
        assert!(registry.get("V", 1).is_some());

        let stats = registry.stats("V").unwrap();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 1);
        assert_eq!(stats.counters.hits, 1);
        assert_eq!(stats.counters.misses, 1);
        assert_eq!(stats.counters.evictions, 1);
    }

    #[test]
    fn concurrent_writers_stay_bounded() {
        let registry = Arc::new(CacheRegistry::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let video = if t % 2 == 0 { "even" } else { "odd" };
                    for i in 0..200 {
                        registry.put(video, i, frame(video, i));
                        let _ = registry.get(video, i / 2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.size("even"), 16);
        assert_eq!(registry.size("odd"), 16);
    }
}
