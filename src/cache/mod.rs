//! # Cache Module
//!
//! Caching of resolved tracks for the music bot.
//!
//! Resolving a query with `yt-dlp` takes seconds; the same songs get requested
//! over and over in a chat. [`TrackCache`] keeps the resolved [`Track`] keyed
//! by the normalized query so a repeated `/play` skips the resolver entirely.
//!
//! ## Features
//!
//! - **Bounded**: least recently used entry is evicted when full
//! - **TTL**: entries expire (stream locators go stale)
//! - **Thread Safety**: backed by `DashMap`
//! - **Metrics**: hit/miss/eviction counters
//!
//! ## Configuration
//!
//! ```env
//! CACHE_SIZE=100   # Maximum number of resolved tracks
//! CACHE_TTL=1h     # Time-to-live (humantime)
//! ```

pub mod lru_cache;

use lru_cache::{CacheMetrics, LRUCache};
use std::time::Duration;
use tracing::info;

use crate::audio::track::Track;

/// Cache de canciones resueltas, indexado por consulta normalizada.
#[derive(Debug, Clone)]
pub struct TrackCache {
    entries: LRUCache<String, Track>,
    ttl: Duration,
}

impl TrackCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LRUCache::new(capacity),
            ttl,
        }
    }

    pub fn get(&self, query: &str) -> Option<Track> {
        self.entries.get(&Self::key(query))
    }

    pub fn put(&self, query: &str, track: Track) {
        self.entries
            .insert_with_ttl(Self::key(query), track, Some(self.ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.entries.metrics()
    }

    /// Mantenimiento periódico: quita las entradas expiradas.
    pub fn cleanup_old_entries(&self) -> usize {
        let removed = self.entries.cleanup_expired();
        if removed > 0 {
            info!(
                "🧹 Cache cleanup: removed {} expired entries ({}/{} in use)",
                removed,
                self.entries.len(),
                self.entries.capacity()
            );
        }
        removed
    }

    fn key(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::UserId;

    #[test]
    fn lookups_ignore_case_and_extra_spaces() {
        let cache = TrackCache::new(10, Duration::from_secs(60));
        cache.put("Never  Gonna Give", Track::new("Rick", "yt:dQw4w9WgXcQ", UserId(1)));

        let hit = cache.get("  never gonna   give ").unwrap();
        assert_eq!(hit.source_locator(), "yt:dQw4w9WgXcQ");
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn expired_entries_are_cleaned_up() {
        let cache = TrackCache::new(10, Duration::ZERO);
        cache.put("a", Track::new("a", "yt:a", UserId(1)));

        assert_eq!(cache.cleanup_old_entries(), 1);
        assert!(cache.is_empty());
    }
}
