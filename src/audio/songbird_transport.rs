use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::YoutubeDl,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Mutex};
use tracing::{debug, error, info, warn};

use super::{
    session::Song, PlaybackEvent, PlaybackHandle, PlaybackSignal, PlayerStatus, StreamOptions,
    TrackTicket, VoiceTransport,
};
use crate::error::{MusicError, MusicResult};

/// Conexiones de voz de songbird
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    events: UnboundedSender<PlaybackEvent>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, events: UnboundedSender<PlaybackEvent>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            events,
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId)
        -> MusicResult<Arc<dyn PlaybackHandle>> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Connection(e.to_string()))?;

        info!("🔊 Unido al canal de voz {} en guild {}", channel_id, guild_id);

        Ok(Arc::new(SongbirdHandle {
            guild_id,
            call,
            http: self.http.clone(),
            events: self.events.clone(),
            track: parking_lot::Mutex::new(None),
        }))
    }

    async fn leave(&self, guild_id: GuildId) {
        if self.manager.get(guild_id).is_none() {
            return;
        }

        match self.manager.remove(guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", guild_id),
            Err(e) => warn!("⚠️ Error al salir del canal de voz: {}", e),
        }
    }
}

/// Reproductor de una llamada de songbird; un track a la vez
pub struct SongbirdHandle {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    events: UnboundedSender<PlaybackEvent>,
    track: parking_lot::Mutex<Option<TrackHandle>>,
}

impl SongbirdHandle {
    fn current_track(&self) -> MusicResult<TrackHandle> {
        self.track.lock().clone().ok_or(MusicError::NotPlaying)
    }

    fn observer(&self, ticket: TrackTicket) -> TrackObserver {
        TrackObserver {
            guild_id: self.guild_id,
            ticket,
            events: self.events.clone(),
        }
    }
}

#[async_trait]
impl PlaybackHandle for SongbirdHandle {
    async fn play(&self, song: &Song, ticket: TrackTicket, options: &StreamOptions)
        -> MusicResult<()> {
        let source =
            YoutubeDl::new(self.http.clone(), song.url.clone()).user_args(options.ytdlp_args());

        let track = {
            let mut call = self.call.lock().await;
            call.play_only_input(source.into())
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(Event::Track(event), self.observer(ticket))
                .map_err(|e| MusicError::Stream(format!("no se pudo registrar el evento: {}", e)))?;
        }

        *self.track.lock() = Some(track);
        Ok(())
    }

    fn pause(&self) -> MusicResult<()> {
        self.current_track()?
            .pause()
            .map_err(|e| MusicError::Stream(e.to_string()))
    }

    fn unpause(&self) -> MusicResult<()> {
        self.current_track()?
            .play()
            .map_err(|e| MusicError::Stream(e.to_string()))
    }

    fn stop(&self) -> MusicResult<()> {
        // Un track ya terminado también cuenta como detenido
        if let Err(e) = self.current_track()?.stop() {
            debug!("Stop sobre un track finalizado: {}", e);
        }
        Ok(())
    }

    async fn status(&self) -> PlayerStatus {
        let Some(track) = self.track.lock().clone() else {
            return PlayerStatus::Idle;
        };

        match track.get_info().await {
            Ok(state) => match state.playing {
                PlayMode::Play => PlayerStatus::Playing,
                PlayMode::Pause => PlayerStatus::Paused,
                _ => PlayerStatus::Idle,
            },
            Err(_) => PlayerStatus::Idle,
        }
    }
}

/// Reenvía el fin o el error de un track al driver con su ticket
struct TrackObserver {
    guild_id: GuildId,
    ticket: TrackTicket,
    events: UnboundedSender<PlaybackEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackObserver {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        let signal = match tracks.first().map(|(state, _)| &state.playing) {
            Some(PlayMode::Errored(e)) => {
                error!("❌ Error en track para guild {}: {:?}", self.guild_id, e);
                PlaybackSignal::Error(format!("{:?}", e))
            }
            _ => {
                debug!("Track terminado en guild {}", self.guild_id);
                PlaybackSignal::Idle
            }
        };

        let event = PlaybackEvent {
            guild_id: self.guild_id,
            ticket: self.ticket,
            signal,
        };
        if self.events.send(event).is_err() {
            warn!("⚠️ Bucle de eventos cerrado, señal descartada");
        }

        Some(Event::Cancel)
    }
}
