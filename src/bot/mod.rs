//! # Bot Module
//!
//! Command layer of the Telegram music bot.
//!
//! [`MusicBot`] turns a parsed [`Command`] into calls on the
//! [`PlaybackScheduler`] and a plain-text reply:
//! - `/play <query>` resolves the query and enqueues the track
//! - `/pause`, `/resume`, `/skip`, `/stop` drive the per-chat state machine
//! - `/queue` and `/nowplaying` render read-only snapshots
//!
//! Control commands are limited to the users in `AUTHORIZED_USERS` (an
//! empty list lets everyone in). The transport (see [`crate::telegram`])
//! only parses messages and sends back whatever this module answers.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use open_music_tg::{bot::{MusicBot, commands::Command}, audio::{ChatId, UserId}};
//! # async fn example(bot: MusicBot) {
//! let reply = bot
//!     .handle_command(ChatId(-100), UserId(42), Command::Play("lofi beats".into()))
//!     .await;
//! println!("{reply}");
//! # }
//! ```

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod commands;
pub mod replies;

pub use commands::Command;

use crate::{
    audio::{
        scheduler::PlaybackScheduler,
        track::{ChatId, UserId},
    },
    cache::TrackCache,
    config::Config,
    error::PlayerResult,
    sources::TrackResolver,
};

/// Fachada de comandos: traduce cada comando en operaciones del núcleo.
#[derive(Clone)]
pub struct MusicBot {
    scheduler: PlaybackScheduler,
    resolver: Arc<dyn TrackResolver>,
    config: Arc<Config>,
}

impl MusicBot {
    pub fn new(
        scheduler: PlaybackScheduler,
        resolver: Arc<dyn TrackResolver>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            scheduler,
            resolver,
            config,
        }
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    /// Ejecuta un comando y devuelve el texto de respuesta para el chat.
    pub async fn handle_command(&self, chat_id: ChatId, user: UserId, command: Command) -> String {
        if command.is_control() && !self.config.is_authorized(user) {
            warn!("⛔ [{}] Usuario {} no autorizado: {:?}", chat_id, user, command);
            return replies::UNAUTHORIZED.to_string();
        }

        debug!("📨 [{}] {} -> {:?}", chat_id, user, command);

        let result = match command {
            Command::Play(query) => self.play(chat_id, user, &query).await,
            Command::Pause => self
                .scheduler
                .pause(chat_id)
                .await
                .map(|_| replies::PAUSED.to_string()),
            Command::Resume => self
                .scheduler
                .resume(chat_id)
                .await
                .map(|_| replies::RESUMED.to_string()),
            Command::Skip => self
                .scheduler
                .skip(chat_id)
                .await
                .map(|track| replies::skipped(&track)),
            Command::Stop => self
                .scheduler
                .stop(chat_id)
                .await
                .map(|_| replies::STOPPED.to_string()),
            Command::Queue => Ok(replies::queue(
                &self
                    .scheduler
                    .queue_snapshot(chat_id, self.config.queue_page_size),
            )),
            Command::NowPlaying => Ok(replies::now_playing(
                self.scheduler.now_playing(chat_id).as_ref(),
                self.scheduler.status(chat_id),
            )),
            Command::Help | Command::Start => Ok(Command::help_text()),
        };

        result.unwrap_or_else(|e| {
            debug!("[{}] Comando rechazado: {}", chat_id, e);
            replies::error(&e)
        })
    }

    async fn play(&self, chat_id: ChatId, user: UserId, query: &str) -> PlayerResult<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(replies::EMPTY_QUERY.to_string());
        }

        let track = self.resolver.resolve(query, user).await?;
        let position = self.scheduler.enqueue_track(chat_id, track.clone())?;

        info!(
            "➕ [{}] '{}' encolada por {} (posición {})",
            chat_id,
            track.title(),
            user,
            position
        );
        Ok(replies::added(&track, position))
    }
}

/// Mantenimiento periódico del cache de canciones resueltas.
pub fn spawn_maintenance(
    cache: TrackCache,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    cache.cleanup_old_entries();
                    let metrics = cache.metrics();
                    debug!(
                        "🧹 Tareas de mantenimiento completadas ({} en cache, hit rate {:.0}%)",
                        cache.len(),
                        metrics.hit_rate() * 100.0
                    );
                }
            }
        }
    })
}
