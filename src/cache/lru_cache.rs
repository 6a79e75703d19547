use dashmap::DashMap;
use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

/// Entrada del cache con TTL
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_access: Instant,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_access: now,
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.ttl
            .map(|ttl| self.created_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_removals: AtomicU64,
}

/// Cache acotado con TTL; al llenarse descarta la entrada usada hace más tiempo.
#[derive(Debug)]
pub struct LRUCache<K: Clone + Eq + Hash, V> {
    data: Arc<DashMap<K, CacheEntry<V>>>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl<K, V> LRUCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Option<Duration>) -> Option<V> {
        if !self.data.contains_key(&key) && self.data.len() >= self.capacity {
            self.evict_least_recent();
        }

        let entry = CacheEntry::new(value, ttl);
        self.data.insert(key, entry).map(|old| old.value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.data.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.last_access = Instant::now();
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired && self.data.remove(key).is_some() {
            self.counters.expired_removals.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Limpia entradas expiradas y retorna el número de elementos removidos
    pub fn cleanup_expired(&self) -> usize {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.data.len());

        if removed > 0 {
            self.counters
                .expired_removals
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Limpiadas {} entradas expiradas del cache", removed);
        }

        removed
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired_removals: self.counters.expired_removals.load(Ordering::Relaxed),
        }
    }

    fn evict_least_recent(&self) {
        let oldest = self
            .data
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            if self.data.remove(&key).is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<K, V> Clone for LRUCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            capacity: self.capacity,
            counters: self.counters.clone(),
        }
    }
}

/// Métricas básicas del cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired_removals: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_when_full() {
        let cache: LRUCache<&'static str, u32> = LRUCache::new(2);
        cache.insert_with_ttl("a", 1, None);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert_with_ttl("b", 2, None);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get(&"a"), Some(1));

        cache.insert_with_ttl("c", 3, None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache: LRUCache<String, u32> = LRUCache::new(10);
        cache.insert_with_ttl("fresh".into(), 1, None);
        cache.insert_with_ttl("stale".into(), 2, Some(Duration::ZERO));

        assert_eq!(cache.get(&"stale".to_string()), None);
        assert_eq!(cache.get(&"fresh".to_string()), Some(1));

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.expired_removals, 1);
        assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cleanup_removes_only_expired() {
        let cache: LRUCache<u8, u8> = LRUCache::new(10);
        cache.insert_with_ttl(1, 1, Some(Duration::ZERO));
        cache.insert_with_ttl(2, 2, Some(Duration::from_secs(3600)));

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache: LRUCache<u8, u8> = LRUCache::new(0);
        assert_eq!(cache.capacity(), 1);

        cache.insert_with_ttl(1, 1, None);
        cache.insert_with_ttl(2, 2, None);
        assert_eq!(cache.len(), cache.capacity());
        assert_eq!(cache.get(&2), Some(2));
    }
}
