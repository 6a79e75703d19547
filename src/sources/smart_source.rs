use async_trait::async_trait;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

use super::{DirectUrlResolver, TrackResolver, YtDlpResolver};
use crate::{
    audio::track::{Track, UserId},
    error::ResolveError,
};

/// Resolver con fallback jerárquico: prueba, en orden de prioridad, cada
/// fuente que acepte la consulta y devuelve el primer éxito.
pub struct SmartResolver {
    sources: Vec<Arc<dyn TrackResolver>>,
}

impl SmartResolver {
    pub fn new(sources: Vec<Arc<dyn TrackResolver>>) -> Self {
        Self { sources }
    }

    /// Archivos directos primero, luego yt-dlp para todo lo demás.
    pub fn with_defaults(ytdlp_bin: impl Into<String>) -> Self {
        Self::new(vec![
            Arc::new(DirectUrlResolver::new()),
            Arc::new(YtDlpResolver::new(ytdlp_bin)),
        ])
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.source_name()).collect()
    }
}

#[async_trait]
impl TrackResolver for SmartResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        let mut last_error = None;

        for source in self.sources.iter().filter(|s| s.accepts(query)) {
            let started = Instant::now();
            debug!("🔍 Intentando fuente: {}", source.source_name());

            match source.resolve(query, requested_by).await {
                Ok(track) => {
                    info!(
                        "✅ Éxito en {} en {:?}: {}",
                        source.source_name(),
                        started.elapsed(),
                        track.title()
                    );
                    return Ok(track);
                }
                Err(e) => {
                    warn!("❌ {} falló: {}", source.source_name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ResolveError::ResolutionFailed(format!("ninguna fuente acepta: {}", query))
        }))
    }

    fn accepts(&self, query: &str) -> bool {
        self.sources.iter().any(|s| s.accepts(query))
    }

    fn source_name(&self) -> &'static str {
        "smart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTrackResolver;
    use pretty_assertions::assert_eq;

    fn mock(name: &'static str, accepts: bool) -> MockTrackResolver {
        let mut mock = MockTrackResolver::new();
        mock.expect_accepts().return_const(accepts);
        mock.expect_source_name().return_const(name);
        mock
    }

    #[tokio::test]
    async fn falls_back_to_next_source_on_failure() {
        let mut first = mock("first", true);
        first
            .expect_resolve()
            .times(1)
            .returning(|_, _| Err(ResolveError::ResolutionFailed("caído".into())));

        let mut second = mock("second", true);
        second
            .expect_resolve()
            .times(1)
            .returning(|q, user| Ok(Track::new(q, "yt:1", user)));

        let smart = SmartResolver::new(vec![Arc::new(first), Arc::new(second)]);
        let track = smart.resolve("song", UserId(2)).await.unwrap();
        assert_eq!(track.title(), "song");
        assert_eq!(track.requested_by(), UserId(2));
    }

    #[tokio::test]
    async fn skips_sources_that_do_not_accept() {
        let mut skipped = mock("skipped", false);
        skipped.expect_resolve().never();

        let mut used = mock("used", true);
        used.expect_resolve()
            .times(1)
            .returning(|q, user| Ok(Track::new(q, "direct", user)));

        let smart = SmartResolver::new(vec![Arc::new(skipped), Arc::new(used)]);
        assert!(smart.resolve("x", UserId(1)).await.is_ok());
    }

    #[tokio::test]
    async fn reports_last_error_when_all_fail() {
        let mut only = mock("only", true);
        only.expect_resolve()
            .returning(|q, _| Err(ResolveError::NotFound(q.to_string())));

        let smart = SmartResolver::new(vec![Arc::new(only)]);
        let err = smart.resolve("nada", UserId(1)).await.unwrap_err();
        assert_eq!(err, ResolveError::NotFound("nada".into()));
    }

    #[tokio::test]
    async fn unsupported_query_is_a_resolution_failure() {
        let smart = SmartResolver::new(vec![Arc::new(mock("none", false))]);
        assert!(!smart.accepts("ftp://x"));
        let err = smart.resolve("ftp://x", UserId(1)).await.unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionFailed(_)));
    }

    #[test]
    fn defaults_prefer_direct_files() {
        let smart = SmartResolver::with_defaults("yt-dlp");
        assert_eq!(smart.source_names(), vec!["direct", "yt-dlp"]);
    }

    #[test]
    fn defaults_accept_pages_from_any_site() {
        let smart = SmartResolver::with_defaults("yt-dlp");
        for query in [
            "https://soundcloud.com/artist/track",
            "https://vimeo.com/123456",
            "https://www.youtube-nocookie.com/embed/abc",
            "https://cdn.example.com/song.mp3",
            "lofi beats",
        ] {
            assert!(smart.accepts(query), "{query} debería aceptarse");
        }
        assert!(!smart.accepts("  "));
    }
}
