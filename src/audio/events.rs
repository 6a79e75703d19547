use super::{
    session::PlaybackToken,
    track::{ChatId, Track},
};
use crate::error::PlayerError;

/// Notificaciones del scheduler hacia la capa de comandos.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// Se entregó la canción al sink.
    Started {
        chat_id: ChatId,
        track: Track,
        token: PlaybackToken,
    },
    Finished {
        chat_id: ChatId,
        track: Track,
    },
    /// El sink falló; la sesión ya avanzó a la siguiente.
    Failed {
        chat_id: ChatId,
        track: Track,
        error: PlayerError,
    },
    /// Llegó el fin de un intento invalidado por `skip`/`stop`.
    Discarded {
        chat_id: ChatId,
        token: PlaybackToken,
    },
}

impl PlaybackEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            PlaybackEvent::Started { chat_id, .. }
            | PlaybackEvent::Finished { chat_id, .. }
            | PlaybackEvent::Failed { chat_id, .. }
            | PlaybackEvent::Discarded { chat_id, .. } => *chat_id,
        }
    }
}
