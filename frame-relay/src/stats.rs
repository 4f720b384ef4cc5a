//! Per-session hit/miss accounting.

use frame_cache::CacheRegistry;
use frame_common::hit_rate;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Hits and misses for one video.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VideoStats {
    pub hits: u64,
    pub misses: u64,
}

impl VideoStats {
    /// Hit rate in percent.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

/// Counters owned by a single client session. Not shared, not locked.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    hits: u64,
    misses: u64,
    per_video: BTreeMap<String, VideoStats>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self, video: &str) {
        self.hits += 1;
        self.video_entry(video).hits += 1;
    }

    pub fn record_miss(&mut self, video: &str) {
        self.misses += 1;
        self.video_entry(video).misses += 1;
    }

    fn video_entry(&mut self, video: &str) -> &mut VideoStats {
        self.per_video.entry(video.to_string()).or_default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hits plus misses.
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Overall hit rate in percent.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    pub fn video(&self, name: &str) -> Option<VideoStats> {
        self.per_video.get(name).copied()
    }

    /// Per-video counters, sorted by video name.
    pub fn videos(&self) -> impl Iterator<Item = (&str, VideoStats)> {
        self.per_video.iter().map(|(name, stats)| (name.as_str(), *stats))
    }

    /// True when a periodic report is due after the latest lookup.
    pub fn report_due(&self, interval: u64) -> bool {
        interval > 0 && self.total() > 0 && self.total() % interval == 0
    }

    /// Multi-line report: totals, per-video counters, then the shared cache
    /// sizes.
    pub fn format_report(&self, peer: &str, cache: &CacheRegistry) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Cache statistics for {}:", peer);
        let _ = writeln!(
            out,
            "  Total: {} hits, {} misses ({:.2}% hit rate)",
            self.hits,
            self.misses,
            self.hit_rate()
        );
        for (name, stats) in self.videos() {
            let _ = writeln!(
                out,
                "  {}: {} hits, {} misses ({:.2}% hit rate)",
                name,
                stats.hits,
                stats.misses,
                stats.hit_rate()
            );
        }
        let _ = write!(out, "  Cache sizes:");
        for (name, size) in cache.videos() {
            let _ = write!(out, " {}={}/{}", name, size, cache.capacity());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_per_video() {
        let mut stats = SessionStats::new();
        stats.record_miss("marc");
        stats.record_hit("marc");
        stats.record_hit("marc");
        stats.record_miss("clip");

        assert_eq!(stats.total(), 4);
        assert_eq!(stats.video("marc"), Some(VideoStats { hits: 2, misses: 1 }));
        assert_eq!(stats.video("clip"), Some(VideoStats { hits: 0, misses: 1 }));
        assert!(stats.video("other").is_none());
        assert!((stats.hit_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_due_every_interval() {
        let mut stats = SessionStats::new();
        assert!(!stats.report_due(2));
        stats.record_miss("a");
        assert!(!stats.report_due(2));
        stats.record_hit("a");
        assert!(stats.report_due(2));
        assert!(!stats.report_due(0));
    }

    #[test]
    fn test_format_report() {
        let cache = CacheRegistry::new(10);
        cache.put("marc", 0, Bytes::from_static(b"x"));

        let mut stats = SessionStats::new();
        stats.record_miss("marc");
        stats.record_hit("marc");

        let report = stats.format_report("127.0.0.1:4000", &cache);
        assert!(report.contains("Total: 1 hits, 1 misses (50.00% hit rate)"));
        assert!(report.contains("marc: 1 hits, 1 misses"));
        assert!(report.ends_with("Cache sizes: marc=1/10"));
    }
}
