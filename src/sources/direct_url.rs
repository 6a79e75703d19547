use async_trait::async_trait;
use url::Url;

use super::TrackResolver;
use crate::{
    audio::track::{Track, UserId},
    error::ResolveError,
};

const AUDIO_EXTENSIONS: [&str; 6] = [".mp3", ".wav", ".ogg", ".flac", ".m4a", ".opus"];

/// Canciones que ya son un archivo accesible por URL: no hace falta
/// extraer nada, el título sale del nombre del archivo.
#[derive(Debug, Default, Clone)]
pub struct DirectUrlResolver;

impl DirectUrlResolver {
    pub fn new() -> Self {
        Self
    }

    fn parse(query: &str) -> Option<Url> {
        let url = Url::parse(query.trim()).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    fn is_audio_path(url: &Url) -> bool {
        let path = url.path().to_lowercase();
        AUDIO_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    fn title_from(url: &Url) -> String {
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("audio");

        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        stem.replace(['_', '-'], " ").replace("%20", " ")
    }
}

#[async_trait]
impl TrackResolver for DirectUrlResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        let url = Self::parse(query)
            .ok_or_else(|| ResolveError::ResolutionFailed(format!("URL inválida: {}", query)))?;

        if !Self::is_audio_path(&url) {
            return Err(ResolveError::ResolutionFailed(format!(
                "la URL no apunta a un archivo de audio: {}",
                url
            )));
        }

        Ok(Track::new(Self::title_from(&url), url.as_str(), requested_by))
    }

    fn accepts(&self, query: &str) -> bool {
        Self::parse(query)
            .map(|url| Self::is_audio_path(&url))
            .unwrap_or(false)
    }

    fn source_name(&self) -> &'static str {
        "direct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_http_audio_files() {
        let resolver = DirectUrlResolver::new();
        assert!(resolver.accepts("https://cdn.example.com/music/song.mp3"));
        assert!(resolver.accepts("http://example.com/a/B.FLAC?sig=1"));
        assert!(!resolver.accepts("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!resolver.accepts("ftp://example.com/song.mp3"));
        assert!(!resolver.accepts("never gonna give you up"));
    }

    #[tokio::test]
    async fn builds_title_from_file_name() {
        let resolver = DirectUrlResolver::new();
        let track = resolver
            .resolve("https://cdn.example.com/music/my_best-song.mp3", UserId(3))
            .await
            .unwrap();

        assert_eq!(track.title(), "my best song");
        assert_eq!(track.source_locator(), "https://cdn.example.com/music/my_best-song.mp3");
        assert_eq!(track.requested_by(), UserId(3));
        assert_eq!(track.duration(), None);
    }

    #[tokio::test]
    async fn rejects_non_audio_urls() {
        let resolver = DirectUrlResolver::new();
        let err = resolver
            .resolve("https://example.com/page.html", UserId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionFailed(_)));
    }
}
