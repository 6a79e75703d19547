use anyhow::{Context, Result};
use async_process::{Command, Stdio};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{sync::OnceLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::TrackResolver;
use crate::{
    audio::track::{Track, UserId},
    error::ResolveError,
};

const MAX_CONCURRENT_LOOKUPS: usize = 3;

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    is_live: Option<bool>,
    /// Presente cuando la respuesta es una búsqueda (`ytsearch1:`).
    #[serde(default)]
    entries: Option<Vec<YtDlpInfo>>,
}

/// Resolver que delega en `yt-dlp` (URLs de YouTube o texto de búsqueda).
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
    // Limitar requests concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(30),
            rate_limiter: Semaphore::new(MAX_CONCURRENT_LOOKUPS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verifica si la URL es de YouTube
    pub fn is_youtube_url(url: &str) -> bool {
        static YOUTUBE: OnceLock<Option<Regex>> = OnceLock::new();
        YOUTUBE
            .get_or_init(|| {
                Regex::new(r"^https?://(www\.|m\.|music\.)?(youtube\.com|youtu\.be)/").ok()
            })
            .as_ref()
            .is_some_and(|re| re.is_match(url.trim()))
    }

    /// Las URLs se pasan tal cual; el texto libre se busca y se toma el primer resultado.
    fn target_for(query: &str) -> String {
        let query = query.trim();
        if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    async fn run(&self, target: &str) -> Result<String> {
        let _permit = self.rate_limiter.acquire().await?;

        debug!("📊 Obteniendo info de: {}", target);

        let mut command = Command::new(&self.binary);
        command
            .args([
                "--no-playlist",
                "--dump-single-json",
                "--skip-download",
                "--no-warnings",
                "--format",
                "bestaudio/best",
                target,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .with_context(|| format!("yt-dlp no respondió en {}s", self.timeout.as_secs()))?
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Convierte la salida JSON de yt-dlp en una canción.
    fn parse_info(json: &str, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        let info: YtDlpInfo = serde_json::from_str(json)
            .context("Error al parsear respuesta de yt-dlp")
            .map_err(ResolveError::from)?;

        let info = match info.entries {
            Some(entries) => entries
                .into_iter()
                .next()
                .ok_or_else(|| ResolveError::NotFound(query.to_string()))?,
            None => info,
        };

        let locator = info
            .webpage_url
            .or(info.url)
            .ok_or_else(|| ResolveError::ResolutionFailed("yt-dlp no devolvió ninguna URL".into()))?;

        if info.is_live.unwrap_or(false) {
            warn!("📡 '{}' es una transmisión en vivo", locator);
        }

        let mut track = Track::new(
            info.title.unwrap_or_else(|| query.to_string()),
            locator,
            requested_by,
        )
        .with_duration_secs(info.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0));

        if let Some(artist) = info.uploader {
            track = track.with_artist(artist);
        }
        if let Some(thumbnail) = info.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }

        Ok(track)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound(String::new()));
        }

        if query.starts_with("http") && !Self::is_youtube_url(query) {
            debug!("🌐 URL fuera de YouTube, se delega en los extractores de yt-dlp");
        }
        info!("🔍 Buscando con yt-dlp: {}", query);
        let stdout = self.run(&Self::target_for(query)).await?;
        let track = Self::parse_info(&stdout, query, requested_by)?;

        info!("✅ Resuelto: {} ({})", track.title(), track.source_locator());
        Ok(track)
    }

    /// yt-dlp es el comodín: cualquier consulta no vacía (búsqueda o URL de
    /// un sitio soportado) se le pasa tal cual.
    fn accepts(&self, query: &str) -> bool {
        !query.trim().is_empty()
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YtDlpResolver::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpResolver::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YtDlpResolver::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YtDlpResolver::is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn search_terms_become_single_result_searches() {
        assert_eq!(YtDlpResolver::target_for("  lofi beats "), "ytsearch1:lofi beats");
        assert_eq!(
            YtDlpResolver::target_for("https://youtu.be/abc"),
            "https://youtu.be/abc"
        );
    }

    #[test]
    fn accepts_any_non_empty_query() {
        let resolver = YtDlpResolver::new("yt-dlp");
        assert!(resolver.accepts("lofi beats"));
        assert!(resolver.accepts("https://youtu.be/abc"));
        assert!(resolver.accepts("https://soundcloud.com/artist/track"));
        assert!(resolver.accepts("https://vimeo.com/123456"));
        assert!(!resolver.accepts("   "));
    }

    #[test]
    fn parses_a_single_video() {
        let json = r#"{
            "title": "Never Gonna Give You Up",
            "duration": 212.6,
            "uploader": "Rick Astley",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "url": "https://rr1.googlevideo.com/videoplayback?x=1"
        }"#;

        let track = YtDlpResolver::parse_info(json, "rick", UserId(5)).unwrap();
        assert_eq!(track.title(), "Never Gonna Give You Up");
        assert_eq!(track.duration_secs(), 213);
        assert_eq!(track.artist(), Some("Rick Astley"));
        assert_eq!(track.source_locator(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(track.requested_by(), UserId(5));
    }

    #[test]
    fn takes_the_first_search_entry() {
        let json = r#"{
            "_type": "playlist",
            "entries": [
                {"title": "First", "duration": 100, "webpage_url": "https://youtu.be/1"},
                {"title": "Second", "duration": 200, "webpage_url": "https://youtu.be/2"}
            ]
        }"#;

        let track = YtDlpResolver::parse_info(json, "q", UserId(1)).unwrap();
        assert_eq!(track.title(), "First");
        assert_eq!(track.source_locator(), "https://youtu.be/1");
    }

    #[test]
    fn empty_search_is_not_found() {
        let json = r#"{"_type": "playlist", "entries": []}"#;
        let err = YtDlpResolver::parse_info(json, "nada", UserId(1)).unwrap_err();
        assert_eq!(err, ResolveError::NotFound("nada".into()));
    }

    #[test]
    fn garbage_output_is_a_resolution_failure() {
        let err = YtDlpResolver::parse_info("not json", "q", UserId(1)).unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionFailed(_)));
    }
}
