use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    events::PlaybackEvent,
    registry::{SessionHandle, SessionRegistry},
    session::{PlaybackStatus, PlaybackToken, QueueSnapshot},
    sink::PlaybackSink,
    track::{ChatId, Track},
};
use crate::error::{PlayerError, PlayerResult};

const EVENT_CAPACITY: usize = 256;

/// Límites que aplica el scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Duración máxima aceptada al encolar, en segundos (0 = sin límite).
    pub max_track_secs: u64,
    /// Tiempo máximo que se espera a que el sink termine una canción.
    pub playback_timeout: Option<Duration>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_track_secs: 3600,
            playback_timeout: Some(Duration::from_secs(3600 + 60)),
        }
    }
}

/// Motor de reproducción por eventos.
///
/// Reacciona a tres disparadores: `enqueue` sobre una sesión libre, el fin
/// (o `skip`) de la canción actual, y nada más. `resume` no pide canción
/// nueva. Cada llamada al sink corre en su propia tarea, así una sesión lenta
/// no frena a las demás, y el lock de la sesión nunca se mantiene durante
/// un `.await`.
#[derive(Clone)]
pub struct PlaybackScheduler {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn PlaybackSink>,
    events: broadcast::Sender<PlaybackEvent>,
    settings: Arc<SchedulerSettings>,
}

impl PlaybackScheduler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        sink: Arc<dyn PlaybackSink>,
        settings: SchedulerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!("🎛️ Scheduler listo con sink `{}`", sink.name());

        Self {
            registry,
            sink,
            events,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Encola una canción ya resuelta. Devuelve la posición en la cola
    /// (0 si empieza de inmediato).
    pub fn enqueue_track(&self, chat_id: ChatId, track: Track) -> PlayerResult<usize> {
        let max = self.settings.max_track_secs;
        if max > 0 && track.duration_secs() > max {
            return Err(PlayerError::TrackTooLong {
                secs: track.duration_secs(),
                max,
            });
        }

        let mut track = track;
        loop {
            let handle = self.registry.get_or_create(chat_id);
            match self.enqueue_on(&handle, track)? {
                Ok(position) => return Ok(position),
                // El barrido la quitó entre el lookup y el lock.
                Err(returned) => track = returned,
            }
        }
    }

    /// Encola en una sesión concreta. Si ya fue retirada devuelve la canción
    /// intacta en `Err` para reintentar con un handle nuevo.
    fn enqueue_on(
        &self,
        handle: &SessionHandle,
        track: Track,
    ) -> PlayerResult<Result<usize, Track>> {
        let (position, idle) = {
            let mut session = handle.write();
            if session.is_retired() {
                return Ok(Err(track));
            }
            let position = session.enqueue(track)?;
            (position, session.status() == PlaybackStatus::Idle)
        };

        if idle {
            self.try_advance(handle);
        }
        Ok(Ok(position))
    }

    pub async fn pause(&self, chat_id: ChatId) -> PlayerResult<()> {
        let handle = self.active_handle(chat_id)?;
        handle.write().pause()?;

        match self.sink.pause(chat_id).await {
            Ok(true) => debug!("⏸️ [{}] Sink pausado", chat_id),
            Ok(false) => debug!("⏸️ [{}] El sink no soporta pausa, solo cambia el estado", chat_id),
            Err(e) => warn!("⚠️ [{}] Error al pausar el sink: {:?}", chat_id, e),
        }
        Ok(())
    }

    pub async fn resume(&self, chat_id: ChatId) -> PlayerResult<()> {
        let handle = self.active_handle(chat_id)?;
        handle.write().resume()?;

        if let Err(e) = self.sink.resume(chat_id).await {
            warn!("⚠️ [{}] Error al reanudar el sink: {:?}", chat_id, e);
        }
        Ok(())
    }

    /// Descarta la canción actual y pasa a la siguiente.
    pub async fn skip(&self, chat_id: ChatId) -> PlayerResult<Track> {
        let handle = self.active_handle(chat_id)?;
        let (skipped, token) = {
            let mut session = handle.write();
            let token = session.active_token();
            (session.skip()?, token)
        };

        if let Some(token) = token {
            self.cancel_sink(chat_id, token).await;
        }
        self.try_advance(&handle);
        Ok(skipped)
    }

    /// Vacía la cola y corta la canción actual. Idempotente.
    pub async fn stop(&self, chat_id: ChatId) -> PlayerResult<()> {
        let Some(handle) = self.registry.get(chat_id) else {
            return Ok(());
        };

        let token = {
            let mut session = handle.write();
            let token = session.active_token();
            session.stop();
            token
        };

        if let Some(token) = token {
            self.cancel_sink(chat_id, token).await;
        }

        handle.write().finish_stop();

        // Si alguien encoló mientras estaba en `Stopping`, seguimos.
        if !self.registry.remove_if_drained(chat_id) {
            self.try_advance(&handle);
        }
        Ok(())
    }

    pub fn queue_snapshot(&self, chat_id: ChatId, limit: usize) -> QueueSnapshot {
        match self.registry.get(chat_id) {
            Some(handle) => handle.read().peek_queue(limit),
            None => QueueSnapshot::empty(chat_id),
        }
    }

    pub fn now_playing(&self, chat_id: ChatId) -> Option<Track> {
        let handle = self.registry.get(chat_id)?;
        let session = handle.read();
        session.current().cloned()
    }

    pub fn status(&self, chat_id: ChatId) -> PlaybackStatus {
        self.registry
            .get(chat_id)
            .map(|handle| handle.read().status())
            .unwrap_or(PlaybackStatus::Idle)
    }

    /// Barrido periódico de sesiones inactivas hasta que se cancele `shutdown`.
    pub fn spawn_housekeeping(
        &self,
        every: Duration,
        max_idle: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = self.registry.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("🛑 Housekeeping detenido");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = registry.sweep_idle(max_idle);
                        debug!(
                            "🧹 Housekeeping: {} sesiones eliminadas, {} activas",
                            removed,
                            registry.len()
                        );
                    }
                }
            }
        })
    }

    /// Si la sesión está libre y tiene cola, arranca la siguiente canción.
    fn try_advance(&self, handle: &SessionHandle) {
        let (chat_id, track, token) = {
            let mut session = handle.write();
            if session.is_retired() {
                return;
            }
            match session.begin_next() {
                Some((track, token)) => (session.chat_id(), track, token),
                None => return,
            }
        };

        let scheduler = self.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            scheduler.run_playback(handle, chat_id, track, token).await;
        });
    }

    async fn run_playback(
        &self,
        handle: SessionHandle,
        chat_id: ChatId,
        track: Track,
        token: PlaybackToken,
    ) {
        // Un skip/stop pudo llegar entre `begin_next` y esta tarea.
        if !handle.read().is_current(token) {
            debug!("⏭️ [{}] '{}' invalidada antes de empezar", chat_id, track.title());
            self.emit(PlaybackEvent::Discarded { chat_id, token });
            return;
        }

        info!("🎵 [{}] Reproduciendo: {}", chat_id, track.title());
        self.emit(PlaybackEvent::Started {
            chat_id,
            track: track.clone(),
            token,
        });

        let play = self.sink.play(chat_id, track, token);
        let outcome = match self.settings.playback_timeout {
            Some(limit) => match tokio::time::timeout(limit, play).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "tiempo agotado tras {}",
                    humantime::format_duration(limit)
                )),
            },
            None => play.await,
        };

        self.complete(&handle, chat_id, token, outcome);
    }

    fn complete(
        &self,
        handle: &SessionHandle,
        chat_id: ChatId,
        token: PlaybackToken,
        outcome: anyhow::Result<()>,
    ) {
        let finished = handle.write().finish_playback(token);

        let track = match finished {
            Ok(track) => track,
            Err(stale) => {
                debug!(
                    "🗑️ [{}] Fin descartado (gen {} , actual {}): {:?}",
                    chat_id,
                    stale.token.generation,
                    stale.current_generation,
                    outcome.err()
                );
                self.emit(PlaybackEvent::Discarded { chat_id, token });
                return;
            }
        };

        match outcome {
            Ok(()) => {
                debug!("✅ [{}] Terminó: {}", chat_id, track.title());
                self.emit(PlaybackEvent::Finished { chat_id, track });
            }
            Err(e) => {
                error!("❌ [{}] Falló '{}': {:#}", chat_id, track.title(), e);
                self.emit(PlaybackEvent::Failed {
                    chat_id,
                    track,
                    error: PlayerError::PlaybackFailed(format!("{:#}", e)),
                });
            }
        }

        self.try_advance(handle);
    }

    async fn cancel_sink(&self, chat_id: ChatId, token: PlaybackToken) {
        if let Err(e) = self.sink.cancel(chat_id, token).await {
            warn!("⚠️ [{}] No se pudo cancelar en el sink: {:?}", chat_id, e);
        }
    }

    fn active_handle(&self, chat_id: ChatId) -> PlayerResult<SessionHandle> {
        let handle = self
            .registry
            .get(chat_id)
            .ok_or(PlayerError::NoActiveSession)?;
        if handle.read().is_retired() {
            return Err(PlayerError::NoActiveSession);
        }
        Ok(handle)
    }

    fn emit(&self, event: PlaybackEvent) {
        // Sin suscriptores no es un error.
        let _ = self.events.send(event);
    }
}
