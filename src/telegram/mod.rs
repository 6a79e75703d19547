//! # Telegram Transport
//!
//! teloxide plumbing around [`MusicBot`]:
//! - a dispatcher that parses commands and sends back the reply, fed by
//!   long polling or by a webhook when `WEBHOOK_URL` is set
//! - a forwarder that announces [`PlaybackEvent`]s in their chat
//! - [`sink::TelegramAudioSink`], the file-delivery playback sink

pub mod sink;

use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types,
    update_listeners::webhooks,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    audio::{
        events::PlaybackEvent,
        track::{ChatId, UserId},
    },
    bot::{commands, replies, Command, MusicBot},
    config::Config,
};

pub use sink::TelegramAudioSink;

pub(crate) fn tg_chat(chat_id: ChatId) -> types::ChatId {
    types::ChatId(chat_id.0)
}

/// Nombre del bot, necesario para aceptar `/cmd@bot` en grupos.
#[derive(Clone)]
struct BotName(Arc<String>);

/// Atiende mensajes hasta Ctrl+C.
pub async fn run(bot: Bot, music: MusicBot, config: &Config) -> Result<()> {
    if let Err(e) = commands::register_commands(&bot).await {
        warn!("⚠️ Error al registrar comandos: {:?}", e);
    }

    let me = bot.get_me().await?;
    let name = me.username().to_string();
    info!("🤖 @{} está en línea!", name);

    let handler = Update::filter_message().endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![music, BotName(Arc::new(name))])
        .enable_ctrlc_handler()
        .build();

    match &config.webhook_url {
        Some(url) => {
            let address = config.listen_address();
            info!("🌐 Webhook en {} escuchando en {}", url, address);
            let listener =
                webhooks::axum(bot, webhooks::Options::new(address, url.clone())).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Error en el webhook"),
                )
                .await;
        }
        None => {
            info!("🔄 Recibiendo actualizaciones por long polling");
            dispatcher.dispatch().await;
        }
    }

    info!("👋 Dispatcher detenido");
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, music: MusicBot, name: BotName) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(command) = Command::from_text(text, &name.0) else {
        return Ok(());
    };

    let user = msg
        .from
        .as_ref()
        .map(|user| UserId(user.id.0))
        .unwrap_or_default();

    let reply = music
        .handle_command(ChatId(msg.chat.id.0), user, command)
        .await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Reenvía los eventos del scheduler a su chat hasta que se cancele `shutdown`.
pub fn spawn_event_forwarder(
    bot: Bot,
    mut events: broadcast::Receiver<PlaybackEvent>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(event) => {
                    let Some(text) = replies::event(&event) else {
                        continue;
                    };
                    if let Err(e) = bot.send_message(tg_chat(event.chat_id()), text).await {
                        error!("❌ [{}] No se pudo notificar: {:?}", event.chat_id(), e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Se perdieron {} eventos de reproducción", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
