use anyhow::{Context, Result};
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::info;

/// Comandos que entiende el bot.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "🎵 Comandos disponibles:")]
pub enum Command {
    #[command(description = "reproduce una canción (URL o búsqueda)")]
    Play(String),
    #[command(description = "pausa la canción actual")]
    Pause,
    #[command(description = "reanuda la reproducción")]
    Resume,
    #[command(description = "salta a la siguiente canción")]
    Skip,
    #[command(description = "detiene la música y vacía la cola")]
    Stop,
    #[command(description = "muestra la cola")]
    Queue,
    #[command(description = "muestra la canción actual")]
    NowPlaying,
    #[command(description = "muestra esta ayuda")]
    Help,
    #[command(description = "muestra esta ayuda")]
    Start,
}

impl Command {
    /// Parsea un mensaje; `None` si no es un comando conocido.
    pub fn from_text(text: &str, bot_name: &str) -> Option<Self> {
        Self::parse(text, bot_name).ok()
    }

    /// Comandos que modifican la reproducción y requieren autorización.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Command::Play(_) | Command::Pause | Command::Resume | Command::Skip | Command::Stop
        )
    }

    pub fn help_text() -> String {
        Self::descriptions().to_string()
    }
}

/// Registra los comandos en el menú de Telegram
pub async fn register_commands(bot: &Bot) -> Result<()> {
    bot.set_my_commands(Command::bot_commands())
        .await
        .context("No se pudieron registrar los comandos")?;

    info!("✅ {} comandos registrados", Command::bot_commands().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_play_with_query() {
        assert_eq!(
            Command::from_text("/play never gonna give you up", "musicbot"),
            Some(Command::Play("never gonna give you up".into()))
        );
        assert_eq!(
            Command::from_text("/play@musicbot https://youtu.be/abc", "musicbot"),
            Some(Command::Play("https://youtu.be/abc".into()))
        );
    }

    #[test]
    fn parses_argument_free_commands() {
        assert_eq!(Command::from_text("/pause", "musicbot"), Some(Command::Pause));
        assert_eq!(Command::from_text("/nowplaying", "musicbot"), Some(Command::NowPlaying));
        assert_eq!(Command::from_text("/queue", "musicbot"), Some(Command::Queue));
    }

    #[test]
    fn ignores_unknown_commands_and_plain_text() {
        assert_eq!(Command::from_text("/volume 10", "musicbot"), None);
        assert_eq!(Command::from_text("hola", "musicbot"), None);
    }

    #[test]
    fn only_playback_commands_need_authorization() {
        assert!(Command::Play("x".into()).is_control());
        assert!(Command::Stop.is_control());
        assert!(!Command::Queue.is_control());
        assert!(!Command::Help.is_control());
    }

    #[test]
    fn help_lists_every_command() {
        let help = Command::help_text();
        for name in ["/play", "/pause", "/resume", "/skip", "/stop", "/queue", "/nowplaying"] {
            assert!(help.contains(name), "falta {name} en la ayuda");
        }
    }
}
