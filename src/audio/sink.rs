use anyhow::Result;
use async_trait::async_trait;

use super::{
    session::PlaybackToken,
    track::{ChatId, Track},
};

/// Colaborador que emite el audio de una canción (stream en llamada de voz
/// o envío del archivo).
///
/// El futuro de `play` se resuelve cuando la reproducción termina; su
/// resultado es la notificación de fin. El scheduler no depende de
/// `pause`/`resume`/`cancel`: si la implementación no los soporta, los
/// valores por defecto no hacen nada.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, chat_id: ChatId, track: Track, token: PlaybackToken) -> Result<()>;

    /// Devuelve `true` si pudo pausar en el momento.
    async fn pause(&self, _chat_id: ChatId) -> Result<bool> {
        Ok(false)
    }

    async fn resume(&self, _chat_id: ChatId) -> Result<bool> {
        Ok(false)
    }

    /// Cancelación best-effort del intento identificado por `token`.
    async fn cancel(&self, _chat_id: ChatId, _token: PlaybackToken) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}
