//! # Audio Module
//!
//! Per-chat playback core for the Telegram music bot.
//!
//! This module owns everything that decides *what* plays and *when*:
//! - Bounded FIFO queues, one per chat
//! - The per-chat playback state machine (idle / playing / paused / stopping)
//! - An event-driven scheduler that hands tracks to a [`sink::PlaybackSink`]
//!
//! It never decides *how* audio is emitted; that is the sink's job (file
//! delivery, voice-chat streaming, ...).
//!
//! ## Architecture
//!
//! ### [`session`] - Session
//! - State machine plus the queue and the current track
//! - Generation counter invalidating completions after `skip`/`stop`
//!
//! ### [`registry`] - SessionRegistry
//! - Concurrent `chat -> session` map, lazy creation, idle sweep
//!
//! ### [`scheduler`] - PlaybackScheduler
//! - Starts the queue head when a session goes idle
//! - At most one outstanding sink call per session
//! - Discards stale completions, reports failures as [`events::PlaybackEvent`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use open_music_tg::audio::{
//!     registry::SessionRegistry,
//!     scheduler::{PlaybackScheduler, SchedulerSettings},
//!     sink::PlaybackSink,
//!     track::{ChatId, Track, UserId},
//! };
//! use std::sync::Arc;
//!
//! # async fn example(sink: Arc<dyn PlaybackSink>) -> anyhow::Result<()> {
//! let registry = Arc::new(SessionRegistry::new(200));
//! let scheduler = PlaybackScheduler::new(registry, sink, SchedulerSettings::default());
//! let chat = ChatId(-1001234567890);
//!
//! let track = Track::new("Song", "https://example.com/song.mp3", UserId(42));
//! scheduler.enqueue_track(chat, track)?;
//!
//! scheduler.pause(chat).await?;
//! scheduler.resume(chat).await?;
//! scheduler.skip(chat).await?;
//! scheduler.stop(chat).await?;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod track;

pub use events::PlaybackEvent;
pub use registry::{SessionHandle, SessionRegistry};
pub use scheduler::{PlaybackScheduler, SchedulerSettings};
pub use session::{PlaybackStatus, PlaybackToken, QueueSnapshot, Session};
pub use sink::PlaybackSink;
pub use track::{ChatId, Track, UserId};
