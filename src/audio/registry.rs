use dashmap::DashMap;
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

use super::{session::Session, track::ChatId};

/// Acceso compartido a una sesión. Solo se retiene durante una operación.
pub type SessionHandle = Arc<RwLock<Session>>;

/// Dueño exclusivo de todas las sesiones, indexadas por chat.
///
/// Las operaciones sobre la misma clave son atómicas (entrada de `DashMap`);
/// al quitar una sesión se marca como retirada bajo su propio lock, para que
/// quien todavía tenga el handle sepa que debe pedir uno nuevo.
///
/// Orden de locks: shard del mapa → sesión. Nunca al revés.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<ChatId, SessionHandle>,
    max_queue: usize,
}

impl SessionRegistry {
    pub fn new(max_queue: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_queue,
        }
    }

    /// Devuelve la sesión del chat o la crea (en `Idle`) si no existe.
    pub fn get_or_create(&self, chat_id: ChatId) -> SessionHandle {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| {
                debug!("🆕 Sesión creada para chat {}", chat_id);
                Arc::new(RwLock::new(Session::new(chat_id, self.max_queue)))
            })
            .clone()
    }

    pub fn get(&self, chat_id: ChatId) -> Option<SessionHandle> {
        self.sessions.get(&chat_id).map(|entry| entry.value().clone())
    }

    /// Quita la sesión; no hace nada si no existe. Se retira con el shard
    /// bloqueado, así la clave nunca desaparece antes que la marca.
    pub fn remove(&self, chat_id: ChatId) {
        let removed = self
            .sessions
            .remove_if(&chat_id, |_, handle| {
                handle.write().retire();
                true
            })
            .is_some();

        if removed {
            debug!("🗑️ Sesión eliminada para chat {}", chat_id);
        }
    }

    /// Quita la sesión solo si quedó libre y vacía. Devuelve si la quitó.
    pub fn remove_if_drained(&self, chat_id: ChatId) -> bool {
        let removed = self
            .sessions
            .remove_if(&chat_id, |_, handle| {
                let mut session = handle.write();
                if session.is_drained() {
                    session.retire();
                    true
                } else {
                    false
                }
            })
            .is_some();

        if removed {
            debug!("🗑️ Sesión vacía eliminada para chat {}", chat_id);
        }
        removed
    }

    /// Elimina las sesiones libres y vacías con más de `max_idle` sin
    /// actividad. Las que estén ocupadas en este momento se dejan para el
    /// próximo barrido.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();

        self.sessions.retain(|_, handle| match handle.try_write() {
            Some(mut session) if session.is_drained() && session.idle_for() >= max_idle => {
                session.retire();
                false
            }
            _ => true,
        });

        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("🧹 Eliminadas {} sesiones inactivas", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }
}
