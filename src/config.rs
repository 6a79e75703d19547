use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use url::Url;

use crate::audio::{scheduler::SchedulerSettings, track::UserId};

#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub authorized_users: HashSet<UserId>,
    pub webhook_url: Option<Url>, // None = long polling
    pub port: u16,

    // Cola y sesiones
    pub max_queue_size: usize,
    pub idle_timeout: Duration,
    pub housekeeping_interval: Duration,
    pub queue_page_size: usize,

    // Límites
    pub max_song_duration: u64, // En segundos, 0 = sin límite
    pub playback_grace: Duration,

    // Rendimiento
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub worker_threads: usize,

    // Paths
    pub download_dir: Option<PathBuf>,
    pub ytdlp_bin: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        if let Some(dir) = &config.download_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("No se pudo crear {}", dir.display()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Construye la configuración a partir de una función de búsqueda de
    /// variables; `load` usa el entorno del proceso.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let duration = |key: &str, default: &str| -> Result<Duration> {
            let raw = var(key, default);
            humantime::parse_duration(raw.trim())
                .with_context(|| format!("{} no es una duración válida: {}", key, raw))
        };

        Ok(Self {
            telegram_token: lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            authorized_users: parse_user_list(&var("AUTHORIZED_USERS", ""))?,
            webhook_url: lookup("WEBHOOK_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|v| Url::parse(v.trim()))
                .transpose()
                .context("WEBHOOK_URL no es una URL válida")?,
            port: var("PORT", "10000").trim().parse().context("PORT")?,

            max_queue_size: var("MAX_QUEUE_SIZE", "200")
                .parse()
                .context("MAX_QUEUE_SIZE")?,
            idle_timeout: duration("IDLE_TIMEOUT", "10m")?,
            housekeeping_interval: duration("HOUSEKEEPING_INTERVAL", "60s")?,
            queue_page_size: var("QUEUE_PAGE_SIZE", "10")
                .parse()
                .context("QUEUE_PAGE_SIZE")?,

            max_song_duration: var("MAX_SONG_DURATION", "3600") // 1 hora
                .parse()
                .context("MAX_SONG_DURATION")?,
            playback_grace: duration("PLAYBACK_GRACE", "60s")?,

            cache_size: var("CACHE_SIZE", "100").parse().context("CACHE_SIZE")?,
            cache_ttl: duration("CACHE_TTL", "1h")?,
            worker_threads: match lookup("WORKER_THREADS") {
                Some(val) if !val.trim().is_empty() => {
                    val.trim().parse().context("WORKER_THREADS")?
                }
                _ => num_cpus::get(),
            },

            download_dir: lookup("DOWNLOAD_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            ytdlp_bin: var("YTDLP_BIN", "yt-dlp"),
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// - The bot token must be present
    /// - Queue bound, cache size and page size must be greater than 0
    /// - Housekeeping and cache cleanup must run at a non-zero interval
    /// - Telegram only delivers webhooks over https
    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.trim().is_empty() {
            anyhow::bail!("TELEGRAM_BOT_TOKEN es obligatorio");
        }

        if let Some(url) = &self.webhook_url {
            if url.scheme() != "https" {
                anyhow::bail!("WEBHOOK_URL debe usar https: {}", url);
            }
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.housekeeping_interval.is_zero() {
            anyhow::bail!("Housekeeping interval must be greater than 0");
        }

        // También es el intervalo de limpieza del cache.
        if self.cache_ttl.is_zero() {
            anyhow::bail!("Cache TTL must be greater than 0");
        }

        if self.worker_threads == 0 {
            anyhow::bail!("Worker threads must be greater than 0");
        }

        Ok(())
    }

    /// Everyone may control playback when the allow-list is empty.
    pub fn is_authorized(&self, user: UserId) -> bool {
        self.authorized_users.is_empty() || self.authorized_users.contains(&user)
    }

    /// Tiempo máximo que el scheduler espera a una reproducción.
    pub fn playback_timeout(&self) -> Option<Duration> {
        (self.max_song_duration > 0)
            .then(|| Duration::from_secs(self.max_song_duration) + self.playback_grace)
    }

    /// Dirección local donde escucha el servidor del webhook.
    pub fn listen_address(&self) -> SocketAddr {
        (Ipv4Addr::UNSPECIFIED, self.port).into()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_track_secs: self.max_song_duration,
            playback_timeout: self.playback_timeout(),
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The bot token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Telegram: {} authorized users ({}), updates via {}\n  \
            Queue: {} max, {} per page, idle timeout {}\n  \
            Limits: {}s max duration, {} grace\n  \
            Cache: {} tracks, ttl {}\n  \
            Runtime: {} workers, yt-dlp at '{}', downloads in {}",
            self.authorized_users.len(),
            if self.authorized_users.is_empty() { "open" } else { "allow-list" },
            self.webhook_url.as_ref().map_or("long polling".to_string(), |url| {
                format!("webhook {} (port {})", url, self.port)
            }),
            self.max_queue_size,
            self.queue_page_size,
            humantime::format_duration(self.idle_timeout),
            self.max_song_duration,
            humantime::format_duration(self.playback_grace),
            self.cache_size,
            humantime::format_duration(self.cache_ttl),
            self.worker_threads,
            self.ytdlp_bin,
            self.download_dir
                .as_ref()
                .map_or("temp dir".to_string(), |d| d.display().to_string()),
        )
    }
}

fn parse_user_list(raw: &str) -> Result<HashSet<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(UserId)
                .with_context(|| format!("AUTHORIZED_USERS contiene un id inválido: {}", s))
        })
        .collect()
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Telegram (no defaults - must be provided)
            telegram_token: String::new(),
            authorized_users: HashSet::new(),
            webhook_url: None,
            port: 10000,

            max_queue_size: 200,
            idle_timeout: Duration::from_secs(600),
            housekeeping_interval: Duration::from_secs(60),
            queue_page_size: 10,

            max_song_duration: 3600, // 1 hora
            playback_grace: Duration::from_secs(60),

            cache_size: 100,
            cache_ttl: Duration::from_secs(3600),
            worker_threads: num_cpus::get(),

            download_dir: None,
            ytdlp_bin: "yt-dlp".to_string(),
        }
    }
}
