use thiserror::Error;

use crate::audio::session::PlaybackStatus;

/// Errores tipados que el núcleo devuelve a la capa de comandos.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("la cola está llena (máximo {max} canciones)")]
    QueueFull { max: usize },

    #[error("no se puede ejecutar `{op}` en estado {status}")]
    InvalidState {
        op: &'static str,
        status: PlaybackStatus,
    },

    #[error("no hay una sesión activa en este chat")]
    NoActiveSession,

    #[error("la canción dura {secs}s y el máximo es {max}s")]
    TrackTooLong { secs: u64, max: u64 },

    #[error("no se encontraron resultados para: {0}")]
    NotFound(String),

    #[error("no se pudo resolver la canción: {0}")]
    ResolutionFailed(String),

    #[error("falló la reproducción: {0}")]
    PlaybackFailed(String),
}

/// Errores de un [`TrackResolver`](crate::sources::TrackResolver).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("sin resultados para `{0}`")]
    NotFound(String),

    #[error("{0}")]
    ResolutionFailed(String),
}

impl From<ResolveError> for PlayerError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(query) => PlayerError::NotFound(query),
            ResolveError::ResolutionFailed(reason) => PlayerError::ResolutionFailed(reason),
        }
    }
}

impl From<anyhow::Error> for ResolveError {
    fn from(err: anyhow::Error) -> Self {
        ResolveError::ResolutionFailed(format!("{:#}", err))
    }
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
