use std::{
    collections::VecDeque,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, info};

use super::track::{ChatId, Track};
use crate::error::{PlayerError, PlayerResult};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Stopping,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Identifica un intento de reproducción concreto.
///
/// Incluye el id de la instancia de sesión además de la generación, así un
/// callback tardío nunca coincide con una sesión recreada para el mismo chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackToken {
    pub session_id: u64,
    pub generation: u64,
}

/// Callback que llegó para un intento de reproducción ya invalidado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleCompletion {
    pub token: PlaybackToken,
    pub current_generation: u64,
}

/// Resultado de `stop`.
#[derive(Debug, Clone, Default)]
pub struct StopSummary {
    pub dropped_current: Option<Track>,
    pub cleared: usize,
}

/// Estado de reproducción de un chat.
///
/// Invariantes:
/// - `current` existe si y solo si el estado es `Playing` o `Paused`.
/// - la cola nunca contiene la canción actual (se saca al empezar).
/// - como mucho un intento de reproducción pendiente por generación.
/// - `queue.len() <= max_queue`.
#[derive(Debug)]
pub struct Session {
    id: u64,
    chat_id: ChatId,
    queue: VecDeque<Track>,
    current: Option<Track>,
    status: PlaybackStatus,
    generation: u64,
    in_flight: bool,
    max_queue: usize,
    last_activity: Instant,
    retired: bool,
}

impl Session {
    pub fn new(chat_id: ChatId, max_queue: usize) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            chat_id,
            queue: VecDeque::new(),
            current: None,
            status: PlaybackStatus::Idle,
            generation: 0,
            in_flight: false,
            max_queue,
            last_activity: Instant::now(),
            retired: false,
        }
    }

    /// Agrega una canción al final de la cola.
    ///
    /// Devuelve la posición (1-based) en la cola, o 0 si la sesión está
    /// libre y la canción va a empezar de inmediato.
    pub fn enqueue(&mut self, track: Track) -> PlayerResult<usize> {
        if self.queue.len() >= self.max_queue {
            return Err(PlayerError::QueueFull {
                max: self.max_queue,
            });
        }

        let starts_now =
            self.status == PlaybackStatus::Idle && !self.in_flight && self.queue.is_empty();

        info!("➕ [{}] Agregado a la cola: {}", self.chat_id, track.title());
        self.queue.push_back(track);
        self.touch();

        Ok(if starts_now { 0 } else { self.queue.len() })
    }

    pub fn pause(&mut self) -> PlayerResult<()> {
        if self.status != PlaybackStatus::Playing {
            return Err(self.invalid("pause"));
        }
        self.status = PlaybackStatus::Paused;
        self.touch();
        info!("⏸️ [{}] Reproducción pausada", self.chat_id);
        Ok(())
    }

    pub fn resume(&mut self) -> PlayerResult<()> {
        if self.status != PlaybackStatus::Paused {
            return Err(self.invalid("resume"));
        }
        self.status = PlaybackStatus::Playing;
        self.touch();
        info!("▶️ [{}] Reproducción reanudada", self.chat_id);
        Ok(())
    }

    /// Descarta la canción actual sin volver a encolarla.
    pub fn skip(&mut self) -> PlayerResult<Track> {
        if !matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
            return Err(self.invalid("skip"));
        }

        let skipped = self.current.take().ok_or_else(|| self.invalid("skip"))?;
        self.generation += 1;
        self.in_flight = false;
        self.status = PlaybackStatus::Idle;
        self.touch();

        info!("⏭️ [{}] Saltada: {}", self.chat_id, skipped.title());
        Ok(skipped)
    }

    /// Vacía la cola y la canción actual. Queda en `Stopping` hasta que el
    /// scheduler llame a [`Session::finish_stop`].
    pub fn stop(&mut self) -> StopSummary {
        let summary = StopSummary {
            dropped_current: self.current.take(),
            cleared: self.queue.len(),
        };

        self.queue.clear();
        self.generation += 1;
        self.in_flight = false;
        self.status = PlaybackStatus::Stopping;
        self.touch();

        info!(
            "⏹️ [{}] Reproducción detenida ({} en cola descartadas)",
            self.chat_id, summary.cleared
        );
        summary
    }

    pub fn finish_stop(&mut self) {
        if self.status == PlaybackStatus::Stopping {
            self.status = PlaybackStatus::Idle;
        }
    }

    /// Instantánea de hasta `limit` canciones en cola, para mostrar.
    pub fn peek_queue(&self, limit: usize) -> QueueSnapshot {
        QueueSnapshot {
            chat_id: self.chat_id,
            status: self.status,
            now_playing: self.current.clone(),
            tracks: self.queue.iter().take(limit).cloned().collect(),
            total: self.queue.len(),
            total_duration: self.total_duration(),
        }
    }

    /// Saca la cabeza de la cola y la convierte en la canción actual.
    ///
    /// Solo actúa en `Idle` sin intento pendiente; si no hay nada que hacer
    /// devuelve `None`.
    pub fn begin_next(&mut self) -> Option<(Track, PlaybackToken)> {
        if self.status != PlaybackStatus::Idle || self.in_flight {
            return None;
        }

        let next = self.queue.pop_front()?;
        self.current = Some(next.clone());
        self.status = PlaybackStatus::Playing;
        self.in_flight = true;
        self.touch();

        debug!(
            "➡️ [{}] Siguiente en cola (FIFO): {} (gen {})",
            self.chat_id,
            next.title(),
            self.generation
        );
        Some((next, self.token()))
    }

    pub fn is_current(&self, token: PlaybackToken) -> bool {
        self.in_flight && token == self.token()
    }

    /// Token del intento pendiente, si lo hay.
    pub fn active_token(&self) -> Option<PlaybackToken> {
        self.in_flight.then(|| self.token())
    }

    /// Cierra el intento identificado por `token`.
    ///
    /// Si el token ya no es el vigente (hubo `skip`/`stop`) no toca nada.
    pub fn finish_playback(&mut self, token: PlaybackToken) -> Result<Track, StaleCompletion> {
        if !self.is_current(token) {
            return Err(StaleCompletion {
                token,
                current_generation: self.generation,
            });
        }

        let finished = self.current.take().ok_or(StaleCompletion {
            token,
            current_generation: self.generation,
        })?;
        self.in_flight = false;
        self.status = PlaybackStatus::Idle;
        self.touch();
        Ok(finished)
    }

    // Consultas

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Libre, sin canción actual, sin cola y sin intento pendiente.
    pub fn is_drained(&self) -> bool {
        self.status == PlaybackStatus::Idle
            && self.current.is_none()
            && self.queue.is_empty()
            && !self.in_flight
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    pub fn total_duration(&self) -> Duration {
        let queued: Duration = self.queue.iter().filter_map(Track::duration).sum();
        let current = self
            .current
            .as_ref()
            .and_then(Track::duration)
            .unwrap_or_default();
        queued + current
    }

    fn token(&self) -> PlaybackToken {
        PlaybackToken {
            session_id: self.id,
            generation: self.generation,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn invalid(&self, op: &'static str) -> PlayerError {
        PlayerError::InvalidState {
            op,
            status: self.status,
        }
    }
}

/// Vista de solo lectura de una cola, recorrible tantas veces como se quiera.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub chat_id: ChatId,
    pub status: PlaybackStatus,
    pub now_playing: Option<Track>,
    tracks: Vec<Track>,
    total: usize,
    total_duration: Duration,
}

impl QueueSnapshot {
    pub fn empty(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            status: PlaybackStatus::Idle,
            now_playing: None,
            tracks: Vec::new(),
            total: 0,
            total_duration: Duration::ZERO,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    /// Canciones incluidas en la instantánea (como mucho el `limit` pedido).
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Largo real de la cola, aunque la instantánea esté recortada.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
