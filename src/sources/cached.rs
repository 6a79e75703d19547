use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::TrackResolver;
use crate::{
    audio::track::{Track, UserId},
    cache::TrackCache,
    error::ResolveError,
};

/// Envuelve otro resolver y recuerda sus resultados.
///
/// Un acierto devuelve la canción como una petición nueva: `requested_by` y
/// `added_at` pasan a ser los de ahora. Los errores nunca se guardan.
pub struct CachedResolver {
    inner: Arc<dyn TrackResolver>,
    cache: TrackCache,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn TrackResolver>, cache: TrackCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }
}

#[async_trait]
impl TrackResolver for CachedResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        if let Some(track) = self.cache.get(query) {
            debug!("💾 Cache hit: {}", query);
            return Ok(track
                .with_requested_by(requested_by)
                .with_added_at(Utc::now()));
        }

        let track = self.inner.resolve(query, requested_by).await?;
        self.cache.put(query, track.clone());
        Ok(track)
    }

    fn accepts(&self, query: &str) -> bool {
        self.inner.accepts(query)
    }

    fn source_name(&self) -> &'static str {
        self.inner.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTrackResolver;
    use std::time::Duration;

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let mut inner = MockTrackResolver::new();
        inner
            .expect_resolve()
            .times(1)
            .returning(|q, user| Ok(Track::new(q, "yt:abc", user).with_duration_secs(90)));

        let resolver = CachedResolver::new(
            Arc::new(inner),
            TrackCache::new(10, Duration::from_secs(60)),
        );

        let first = resolver.resolve("Song", UserId(1)).await.unwrap();
        let second = resolver.resolve("song ", UserId(2)).await.unwrap();

        assert_eq!(first.requested_by(), UserId(1));
        assert_eq!(second.requested_by(), UserId(2));
        assert_eq!(second.source_locator(), "yt:abc");
        assert_eq!(resolver.cache().metrics().hits, 1);
    }

    #[tokio::test]
    async fn cache_hit_is_stamped_with_the_new_request_time() {
        let resolved_at = Utc::now() - chrono::Duration::hours(1);
        let mut inner = MockTrackResolver::new();
        inner
            .expect_resolve()
            .times(1)
            .returning(move |q, user| Ok(Track::new(q, "yt:abc", user).with_added_at(resolved_at)));

        let resolver = CachedResolver::new(
            Arc::new(inner),
            TrackCache::new(10, Duration::from_secs(3600)),
        );

        let first = resolver.resolve("song", UserId(1)).await.unwrap();
        assert_eq!(first.added_at(), resolved_at);

        let asked_at = Utc::now();
        let hit = resolver.resolve("song", UserId(2)).await.unwrap();
        assert!(hit.added_at() >= asked_at);
        assert_eq!(resolver.cache().get("song").unwrap().added_at(), resolved_at);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mut inner = MockTrackResolver::new();
        inner
            .expect_resolve()
            .times(2)
            .returning(|q, _| Err(ResolveError::NotFound(q.to_string())));

        let resolver = CachedResolver::new(
            Arc::new(inner),
            TrackCache::new(10, Duration::from_secs(60)),
        );

        assert!(resolver.resolve("x", UserId(1)).await.is_err());
        assert!(resolver.resolve("x", UserId(1)).await.is_err());
        assert!(resolver.cache().is_empty());
    }
}
