//! Frame caching for the relay.
//!
//! [`VideoCache`] is a bounded LRU of one video's frames; [`CacheRegistry`]
//! owns one such cache per video name and is shared between client sessions.

pub mod lru;
pub mod registry;

pub use lru::{CacheCounters, VideoCache, DEFAULT_CAPACITY};
pub use registry::{CacheRegistry, VideoCacheStats};
