use anyhow::{Context, Result};
use async_process::{Command, Stdio};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use teloxide::{prelude::*, types::InputFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::tg_chat;
use crate::audio::{
    session::PlaybackToken,
    sink::PlaybackSink,
    track::{ChatId, Track},
};

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "ogg", "opus", "flac", "wav"];

/// Sink de entrega de archivos: descarga el audio con yt-dlp y lo envía
/// al chat con `send_audio`. La reproducción "termina" cuando Telegram
/// acepta el archivo.
///
/// No hay reproducción en vivo que congelar, así que `pause`/`resume` usan
/// los valores por defecto del trait.
pub struct TelegramAudioSink {
    bot: Bot,
    ytdlp_bin: String,
    download_dir: Option<PathBuf>,
    active: DashMap<ChatId, (PlaybackToken, CancellationToken)>,
}

impl TelegramAudioSink {
    pub fn new(bot: Bot, ytdlp_bin: impl Into<String>, download_dir: Option<PathBuf>) -> Self {
        Self {
            bot,
            ytdlp_bin: ytdlp_bin.into(),
            download_dir,
            active: DashMap::new(),
        }
    }

    fn download_args(locator: &str, output_template: &str) -> Vec<String> {
        [
            "-o",
            output_template,
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
            "--no-playlist",
            "--no-warnings",
            "--format",
            "bestaudio/best",
            "--socket-timeout",
            "30",
            locator,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn temp_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("open-music-");

        let dir = match &self.download_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        dir.context("No se pudo crear el directorio temporal")
    }

    async fn download(&self, track: &Track, dir: &Path) -> Result<PathBuf> {
        let template = dir.join("%(id)s.%(ext)s");
        let args = Self::download_args(track.source_locator(), &template.to_string_lossy());

        debug!("⬇️ {} {}", self.ytdlp_bin, args.join(" "));

        let output = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        find_audio_file(dir)
            .await?
            .context("yt-dlp terminó pero no dejó ningún archivo de audio")
    }

    async fn deliver(&self, chat_id: ChatId, track: &Track) -> Result<()> {
        let dir = self.temp_dir()?;
        let file = self.download(track, dir.path()).await?;

        info!("📤 [{}] Enviando {}", chat_id, file.display());

        let mut request = self
            .bot
            .send_audio(tg_chat(chat_id), InputFile::file(&file))
            .title(track.title());
        if let Some(artist) = track.artist() {
            request = request.performer(artist);
        }
        request.await.context("Telegram rechazó el audio")?;

        // `dir` se borra al salir, junto con el archivo.
        Ok(())
    }
}

#[async_trait]
impl PlaybackSink for TelegramAudioSink {
    async fn play(&self, chat_id: ChatId, track: Track, token: PlaybackToken) -> Result<()> {
        let cancel = CancellationToken::new();
        self.active.insert(chat_id, (token, cancel.clone()));

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(anyhow::anyhow!("envío cancelado")),
            result = self.deliver(chat_id, &track) => result,
        };

        self.active.remove_if(&chat_id, |_, (active, _)| *active == token);
        result
    }

    async fn cancel(&self, chat_id: ChatId, token: PlaybackToken) -> Result<()> {
        match self.active.remove_if(&chat_id, |_, (active, _)| *active == token) {
            Some((_, (_, cancel))) => {
                debug!("🛑 [{}] Cancelando envío", chat_id);
                cancel.cancel();
            }
            None => warn!("⚠️ [{}] Nada que cancelar para ese intento", chat_id),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram-audio"
    }
}

/// Primer archivo de audio dentro de `dir`.
async fn find_audio_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("No se pudo leer {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_audio = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_audio {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
