//! # Audio Module
//!
//! Per-guild playback sessions and the driver that moves them from song to song.
//!
//! ## Architecture
//!
//! ### [`registry`] - Session Registry
//! - At most one [`session::GuildSession`] per guild
//! - A session lives from its first queued song until the queue runs out
//!
//! ### [`driver`] - Playback Driver
//! - Starts, queues and advances songs
//! - Consumes idle/error signals from the playback handle, one at a time
//! - Renders the progress panel and applies interactive controls
//!
//! ### [`songbird_transport`] - Voice Transport
//! - Songbird implementation of [`VoiceTransport`] and [`PlaybackHandle`]
//!
//! The driver only talks to the outside world through the traits in this
//! module, so the voice connection, the stream source and the chat surface can
//! be swapped (and faked in tests).

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;

use crate::error::MusicResult;

pub mod driver;
pub mod progress;
pub mod registry;
pub mod session;
pub mod songbird_transport;

#[cfg(test)]
pub(crate) mod testing;

use session::{PanelView, Song};

pub type SessionId = u64;

/// Identifica una canción concreta dentro de una sesión concreta.
///
/// Toda señal del handle de reproducción lleva el ticket del track que la
/// produjo; el driver descarta las que no coinciden con el track actual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackTicket {
    pub session: SessionId,
    pub epoch: u64,
}

/// Estado reportado por el handle de reproducción
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Playing,
    Paused,
    Idle,
}

/// Señal terminal de un track
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSignal {
    /// El stream llegó al final (o fue detenido)
    Idle,
    /// El stream falló
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    pub guild_id: GuildId,
    pub ticket: TrackTicket,
    pub signal: PlaybackSignal,
}

/// Opciones para abrir el stream de una canción
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub audio_only: bool,
    /// Selector de formato de yt-dlp (`bestaudio`, `worstaudio`...)
    pub quality: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            audio_only: true,
            quality: "bestaudio".to_string(),
        }
    }
}

impl StreamOptions {
    /// Argumentos adicionales para yt-dlp
    pub fn ytdlp_args(&self) -> Vec<String> {
        let format = if self.audio_only {
            format!("{}/best", self.quality)
        } else {
            "best".to_string()
        };
        vec!["-f".to_string(), format]
    }
}

/// Reproductor de audio asociado a una conexión de voz.
///
/// Las señales idle/error no se devuelven desde aquí: la implementación las
/// publica como [`PlaybackEvent`] en el canal del driver.
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Adjunta el stream de `song` y empieza a reproducirlo
    async fn play(&self, song: &Song, ticket: TrackTicket, options: &StreamOptions)
        -> MusicResult<()>;
    fn pause(&self) -> MusicResult<()>;
    fn unpause(&self) -> MusicResult<()>;
    /// Detiene el track actual; la implementación emite la señal idle
    fn stop(&self) -> MusicResult<()>;
    async fn status(&self) -> PlayerStatus;
}

/// Conexiones de voz por guild
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId)
        -> MusicResult<Arc<dyn PlaybackHandle>>;
    async fn leave(&self, guild_id: GuildId);
}

/// Mensaje renderizado que luego se edita
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Superficie de chat donde se anuncia y se dibuja el panel
#[async_trait]
pub trait NowPlayingSurface: Send + Sync {
    async fn announce(&self, channel_id: ChannelId, text: &str) -> MusicResult<()>;
    async fn render(&self, channel_id: ChannelId, panel: &PanelView) -> MusicResult<DisplayRef>;
    async fn update(&self, display: &DisplayRef, panel: &PanelView) -> MusicResult<()>;
}
