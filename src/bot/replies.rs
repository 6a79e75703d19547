//! Textos que el bot envía al chat. Todo es texto plano: Telegram no
//! necesita escapar nada y los títulos pueden traer cualquier carácter.

use std::time::Duration;

use crate::{
    audio::{
        events::PlaybackEvent,
        session::{PlaybackStatus, QueueSnapshot},
        track::Track,
    },
    error::PlayerError,
};

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn duration_label(track: &Track) -> String {
    track
        .duration()
        .map(format_duration)
        .unwrap_or_else(|| "?".to_string())
}

fn track_line(track: &Track) -> String {
    match track.artist() {
        Some(artist) => format!("{} - {} [{}]", track.title(), artist, duration_label(track)),
        None => format!("{} [{}]", track.title(), duration_label(track)),
    }
}

pub fn added(track: &Track, position: usize) -> String {
    // Al empezar ya llega el anuncio de "Sonando" con el detalle completo.
    if position == 0 {
        format!("✅ Encontrada, empieza ahora: {}", track.title())
    } else {
        format!("➕ Añadido a la cola (#{}): {}", position, track_line(track))
    }
}

pub fn now_playing(track: Option<&Track>, status: PlaybackStatus) -> String {
    match track {
        Some(track) => {
            let icon = if status == PlaybackStatus::Paused { "⏸️" } else { "🎵" };
            let mut text = format!(
                "{} {}\n👤 Pedida por {} a las {} UTC",
                icon,
                track_line(track),
                track.requested_by(),
                track.added_at().format("%H:%M")
            );
            if let Some(thumbnail) = track.thumbnail() {
                text.push_str(&format!("\n🖼️ {}", thumbnail));
            }
            text
        }
        None => "🔇 No hay nada sonando".to_string(),
    }
}

pub fn queue(snapshot: &QueueSnapshot) -> String {
    let mut lines = Vec::new();

    if let Some(track) = &snapshot.now_playing {
        lines.push(now_playing(Some(track), snapshot.status));
    }

    if snapshot.total() == 0 {
        lines.push("📭 La cola está vacía".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "📋 Cola: {} canciones ({} en total)",
        snapshot.total(),
        format_duration(snapshot.total_duration())
    ));
    for (i, track) in snapshot.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, track_line(track)));
    }

    let hidden = snapshot.total() - snapshot.len();
    if hidden > 0 {
        lines.push(format!("... y {} más", hidden));
    }

    lines.join("\n")
}

pub fn skipped(track: &Track) -> String {
    format!("⏭️ Saltada: {}", track.title())
}

pub fn error(err: &PlayerError) -> String {
    let icon = match err {
        PlayerError::NotFound(_) => "🔍",
        PlayerError::QueueFull { .. } | PlayerError::TrackTooLong { .. } => "🚫",
        _ => "❌",
    };
    let mut text = err.to_string();
    if let Some(first) = text.get(0..1) {
        let upper = first.to_uppercase();
        text.replace_range(0..1, &upper);
    }
    format!("{} {}", icon, text)
}

pub const UNAUTHORIZED: &str = "⛔ No tienes permiso para controlar la música";
pub const EMPTY_QUERY: &str = "Uso: /play <URL o búsqueda>";
pub const PAUSED: &str = "⏸️ Pausado";
pub const RESUMED: &str = "▶️ Reanudado";
pub const STOPPED: &str = "⏹️ Música detenida y cola vaciada";

/// Mensaje para el chat en respuesta a un evento del scheduler, si corresponde.
pub fn event(event: &PlaybackEvent) -> Option<String> {
    match event {
        PlaybackEvent::Started { track, .. } => Some(format!("🎵 Sonando: {}", track_line(track))),
        PlaybackEvent::Failed { track, error, .. } => Some(format!(
            "⚠️ No se pudo reproducir '{}': {}",
            track.title(),
            error
        )),
        PlaybackEvent::Finished { .. } | PlaybackEvent::Discarded { .. } => None,
    }
}
