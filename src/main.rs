use anyhow::Result;
use std::sync::Arc;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use open_music_tg::{
    audio::{PlaybackScheduler, SessionRegistry},
    bot::{spawn_maintenance, MusicBot},
    cache::TrackCache,
    config::Config,
    sources::{CachedResolver, SmartResolver},
    telegram::{self, TelegramAudioSink},
};

fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_music_tg=debug".parse()?)
                .add_directive("teloxide=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Music TG v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()?;

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return runtime.block_on(health_check(&config));
    }

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let bot = Bot::new(&config.telegram_token);

    let cache = TrackCache::new(config.cache_size, config.cache_ttl);
    let resolver = Arc::new(CachedResolver::new(
        Arc::new(SmartResolver::with_defaults(config.ytdlp_bin.clone())),
        cache.clone(),
    ));

    let sink = Arc::new(TelegramAudioSink::new(
        bot.clone(),
        config.ytdlp_bin.clone(),
        config.download_dir.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(config.max_queue_size));
    let scheduler = PlaybackScheduler::new(registry, sink, config.scheduler_settings());

    let shutdown = CancellationToken::new();
    let tasks = vec![
        scheduler.spawn_housekeeping(
            config.housekeeping_interval,
            config.idle_timeout,
            shutdown.clone(),
        ),
        spawn_maintenance(cache, config.cache_ttl, shutdown.clone()),
        telegram::spawn_event_forwarder(bot.clone(), scheduler.subscribe(), shutdown.clone()),
    ];

    let music = MusicBot::new(scheduler, resolver, config.clone());

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = telegram::run(bot, music, &config).await {
        error!("Error al ejecutar el bot: {:?}", why);
    }

    info!("⚠️ Señal de shutdown recibida, cerrando...");
    shutdown.cancel();
    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            error!("Tarea de fondo terminó con error: {:?}", e);
        }
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new(&config.ytdlp_bin)
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
