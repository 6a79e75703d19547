//! Per-chat playback queue and session engine for a Telegram music bot.
//!
//! - [`audio`]: sessions, registry and the event-driven scheduler
//! - [`sources`]: query resolution (yt-dlp, direct URLs, caching)
//! - [`bot`]: command facade and reply rendering
//! - [`telegram`]: teloxide transport and the file-delivery sink

pub mod audio;
pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod sources;
pub mod telegram;
