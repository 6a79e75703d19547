use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Identificador de chat (clave de la sesión).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Identificador del usuario que pidió la canción.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptor inmutable de una canción reproducible.
///
/// Lo construye un resolver (o la capa de comandos para medios ya
/// descargados). Los campos son privados: una vez creada no cambia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    title: String,
    duration_secs: u64,
    source_locator: String,
    requested_by: UserId,
    artist: Option<String>,
    thumbnail: Option<String>,
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>, source_locator: impl Into<String>, requested_by: UserId) -> Self {
        Self {
            title: title.into(),
            duration_secs: 0,
            source_locator: source_locator.into(),
            requested_by,
            artist: None,
            thumbnail: None,
            added_at: Utc::now(),
        }
    }

    // Getters
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Duración en segundos; 0 significa desconocida.
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    // Builders
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_requested_by(mut self, user_id: UserId) -> Self {
        self.requested_by = user_id;
        self
    }

    /// Momento en que se pidió. Al reutilizar una canción ya resuelta se
    /// actualiza a la nueva petición.
    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = added_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_means_unknown() {
        let track = Track::new("Intro", "https://example.com/a.mp3", UserId(1));
        assert_eq!(track.duration(), None);

        let track = track.with_duration_secs(215);
        assert_eq!(track.duration(), Some(Duration::from_secs(215)));
        assert_eq!(track.duration_secs(), 215);
    }

    #[test]
    fn builders_keep_identity_fields() {
        let track = Track::new("Song", "yt:abc", UserId(7))
            .with_artist("Band")
            .with_requested_by(UserId(9));

        assert_eq!(track.title(), "Song");
        assert_eq!(track.source_locator(), "yt:abc");
        assert_eq!(track.artist(), Some("Band"));
        assert_eq!(track.requested_by(), UserId(9));
    }
}
