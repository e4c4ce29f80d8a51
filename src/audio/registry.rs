use serenity::model::id::GuildId;
use std::collections::HashMap;

use super::session::GuildSession;
use crate::error::{MusicError, MusicResult};

/// Mapa guild -> sesión activa. Como máximo una sesión por guild.
///
/// No tiene sincronización propia: el driver lo envuelve en un único mutex.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<GuildId, GuildSession>,
    // `stop`s por guild; distingue una sesión detenida de una que se agotó
    stops: HashMap<GuildId, u64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<&GuildSession> {
        self.sessions.get(&guild_id)
    }

    pub fn get_mut(&mut self, guild_id: GuildId) -> Option<&mut GuildSession> {
        self.sessions.get_mut(&guild_id)
    }

    /// Registra una sesión nueva; falla si la guild ya tiene una
    pub fn create(&mut self, session: GuildSession) -> MusicResult<&mut GuildSession> {
        let guild_id = session.guild_id();
        match self.sessions.entry(guild_id) {
            std::collections::hash_map::Entry::Occupied(_) => {
                Err(MusicError::SessionExists(guild_id))
            }
            std::collections::hash_map::Entry::Vacant(slot) => Ok(slot.insert(session)),
        }
    }

    pub fn remove(&mut self, guild_id: GuildId) -> Option<GuildSession> {
        self.sessions.remove(&guild_id)
    }

    pub fn record_stop(&mut self, guild_id: GuildId) {
        *self.stops.entry(guild_id).or_default() += 1;
    }

    pub fn stop_count(&self, guild_id: GuildId) -> u64 {
        self.stops.get(&guild_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
