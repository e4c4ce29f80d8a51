//! # Playback Driver
//!
//! Moves every guild session through `Loading -> Playing <-> Paused ->
//! Advancing -> (Loading | Terminated)`.
//!
//! The registry lives behind a single `parking_lot` mutex whose guard is never
//! held across an `.await`: every external call (search, voice join, stream
//! attach, status query, panel render) happens with the lock released, and the
//! continuation re-fetches the session by guild and compares the session id or
//! [`TrackTicket`] before touching it. A `stop` that lands while a `play` is
//! still searching therefore turns the late continuation into a no-op; a
//! session that merely ran out of songs in the meantime does not.
//!
//! Idle/error signals arrive as [`PlaybackEvent`]s on one channel and are
//! consumed by [`PlaybackDriver::run_events`] one at a time.

use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    registry::SessionRegistry,
    session::{GuildSession, PanelView, PlaybackState, QueueSnapshot, Song},
    DisplayRef, NowPlayingSurface, PlaybackEvent, PlaybackHandle, PlaybackSignal, PlayerStatus,
    StreamOptions, TrackTicket, VoiceTransport,
};
use crate::{
    config::{Config, PanelMode},
    error::{MusicError, MusicResult},
    sources::{pick_playable, MediaResolver},
};

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub panel_mode: PanelMode,
    pub progress_tick: Duration,
    pub controls_ttl: Duration,
    pub max_queue_size: usize,
    pub default_song_duration: u64,
    pub stream: StreamOptions,
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            panel_mode: config.panel_mode,
            progress_tick: config.progress_tick,
            controls_ttl: config.controls_ttl,
            max_queue_size: config.max_queue_size,
            default_song_duration: config.default_song_duration,
            stream: StreamOptions::default(),
        }
    }
}

/// Pedido de `!play`
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// Sesión nueva: la canción empezó a cargarse
    Started(Song),
    /// Agregada a una sesión existente en la posición indicada
    Queued { song: Song, position: usize },
    /// La sesión se detuvo mientras se resolvía el pedido
    Cancelled(Song),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    Resumed,
    AlreadyPaused,
    AlreadyPlaying,
}

/// Vocabulario de los botones del panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Previous,
    TogglePause,
    Skip,
    ToggleLoop,
    Shuffle,
    ShowQueue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Previous(Song),
    Pause(PauseOutcome),
    Skipped(Option<Song>),
    Loop(bool),
    Shuffled(usize),
    Queue(QueueSnapshot),
}

pub struct PlaybackDriver {
    sessions: Mutex<SessionRegistry>,
    resolver: Arc<dyn MediaResolver>,
    transport: Arc<dyn VoiceTransport>,
    surface: Arc<dyn NowPlayingSurface>,
    settings: DriverSettings,
    next_session_id: AtomicU64,
}

impl PlaybackDriver {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        transport: Arc<dyn VoiceTransport>,
        surface: Arc<dyn NowPlayingSurface>,
        settings: DriverSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(SessionRegistry::new()),
            resolver,
            transport,
            surface,
            settings,
            next_session_id: AtomicU64::new(1),
        })
    }

    pub fn has_session(&self, guild_id: GuildId) -> bool {
        self.sessions.lock().contains(guild_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Consume las señales de los handles hasta que se cierre el canal
    pub async fn run_events(self: Arc<Self>, mut events: UnboundedReceiver<PlaybackEvent>) {
        info!("🎧 Bucle de eventos de reproducción iniciado");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("🎧 Canal de eventos cerrado, bucle terminado");
    }

    /// Busca la canción y la reproduce o la encola.
    ///
    /// La primera canción de una guild crea la sesión y se une al canal de
    /// voz; si la unión falla la sesión se deshace.
    pub async fn enqueue(self: &Arc<Self>, request: PlayRequest) -> MusicResult<Enqueued> {
        let guild_id = request.guild_id;
        let stops_seen = self.sessions.lock().stop_count(guild_id);

        let hits = self.resolver.search(&request.query).await?;
        let song = pick_playable(hits, self.settings.default_song_duration)
            .ok_or_else(|| MusicError::SearchEmpty(request.query.clone()))?;

        let session_id = {
            let mut sessions = self.sessions.lock();

            if let Some(session) = sessions.get_mut(guild_id) {
                let position = session.enqueue(song.clone(), self.settings.max_queue_size)?;
                return Ok(Enqueued::Queued { song, position });
            }

            if sessions.stop_count(guild_id) != stops_seen {
                info!("⏹️ La sesión de {} se detuvo durante la búsqueda", guild_id);
                return Ok(Enqueued::Cancelled(song));
            }

            let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            sessions.create(GuildSession::new(
                id,
                guild_id,
                request.text_channel,
                request.voice_channel,
                song.clone(),
            ))?;
            id
        };

        let handle = match self.transport.join(guild_id, request.voice_channel).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("❌ No se pudo unir al canal de voz en {}: {}", guild_id, e);
                let mut sessions = self.sessions.lock();
                if sessions.get(guild_id).map(GuildSession::id) == Some(session_id) {
                    sessions.remove(guild_id);
                }
                return Err(e);
            }
        };

        let attached = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(guild_id) {
                Some(session) if session.id() == session_id => {
                    session.attach_handle(handle);
                    true
                }
                _ => false,
            }
        };

        if !attached {
            info!("⏹️ La sesión de {} se detuvo antes de conectar", guild_id);
            self.leave_if_idle(guild_id).await;
            return Ok(Enqueued::Cancelled(song));
        }

        info!("🔊 Conectado al canal de voz en guild {}", guild_id);
        self.advance(guild_id, session_id).await;

        Ok(Enqueued::Started(song))
    }

    /// Atiende una señal idle/error de un handle
    pub async fn handle_event(self: &Arc<Self>, event: PlaybackEvent) {
        let session_id = {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(event.guild_id) else {
                debug!("Señal para guild {} sin sesión, ignorada", event.guild_id);
                return;
            };

            if !session.accepts(event.ticket) {
                debug!(
                    "Señal obsoleta {:?} en guild {}, ignorada",
                    event.ticket, event.guild_id
                );
                return;
            }

            match &event.signal {
                PlaybackSignal::Idle => {
                    debug!("Track terminado en guild {}", event.guild_id);
                    session.finish_current();
                }
                PlaybackSignal::Error(reason) => {
                    warn!(
                        "⚠️ {} en guild {}, saltando canción",
                        MusicError::Stream(reason.clone()),
                        event.guild_id
                    );
                    session.drop_current();
                }
            }

            session.id()
        };

        self.advance(event.guild_id, session_id).await;
    }

    /// Carga la siguiente canción, o termina la sesión si la cola se agotó.
    ///
    /// Un fallo al adjuntar el stream cuenta como error de stream: la canción
    /// se descarta y se intenta con la siguiente.
    async fn advance(self: &Arc<Self>, guild_id: GuildId, session_id: u64) {
        loop {
            let next = {
                let mut sessions = self.sessions.lock();
                let Some(session) = sessions.get_mut(guild_id).filter(|s| s.id() == session_id)
                else {
                    return;
                };
                let Some(handle) = session.handle() else {
                    return;
                };

                let voice_channel = session.voice_channel();
                match session.begin_next() {
                    Some((song, ticket)) => Some((song, ticket, handle, voice_channel)),
                    None => {
                        sessions.remove(guild_id);
                        None
                    }
                }
            };

            let Some((song, ticket, handle, voice_channel)) = next else {
                info!("📭 Cola vacía, sesión terminada en guild {}", guild_id);
                self.leave_if_idle(guild_id).await;
                return;
            };

            info!("🎵 Reproduciendo: {} (canal {})", song.title, voice_channel);

            match handle.play(&song, ticket, &self.settings.stream).await {
                Ok(()) => {
                    self.on_track_started(guild_id, ticket).await;
                    return;
                }
                Err(e) => {
                    warn!("⚠️ No se pudo iniciar '{}': {}", song.title, e);
                    let mut sessions = self.sessions.lock();
                    match sessions.get_mut(guild_id) {
                        Some(session) if session.accepts(ticket) => session.drop_current(),
                        _ => return,
                    }
                }
            }
        }
    }

    async fn on_track_started(self: &Arc<Self>, guild_id: GuildId, ticket: TrackTicket) {
        let started = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(guild_id) {
                Some(session) if session.accepts(ticket) => {
                    session.mark_playing(Instant::now() + self.settings.controls_ttl);
                    session
                        .panel_view()
                        .map(|view| (view, session.text_channel()))
                }
                _ => None,
            }
        };

        let Some((view, text_channel)) = started else {
            return;
        };

        match self.settings.panel_mode {
            PanelMode::Plain => {
                let text = format!("🎶 Reproduciendo: **{}**", view.title);
                if let Err(e) = self.surface.announce(text_channel, &text).await {
                    warn!("⚠️ No se pudo anunciar la canción: {}", e);
                }
            }
            PanelMode::Enhanced => match self.surface.render(text_channel, &view).await {
                Ok(display) => {
                    let token = CancellationToken::new();
                    let installed = {
                        let mut sessions = self.sessions.lock();
                        match sessions.get_mut(guild_id) {
                            Some(session) if session.accepts(ticket) => {
                                session.attach_display(display, token.clone());
                                true
                            }
                            _ => false,
                        }
                    };

                    if installed {
                        tokio::spawn(Arc::clone(self).run_ticker(guild_id, ticket, display, token));
                    }
                }
                Err(e) => warn!("⚠️ {}", MusicError::DisplayUpdate(e.to_string())),
            },
        }
    }

    async fn run_ticker(
        self: Arc<Self>,
        guild_id: GuildId,
        ticket: TrackTicket,
        display: DisplayRef,
        token: CancellationToken,
    ) {
        let period = self.settings.progress_tick;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if !self.tick_progress(guild_id, ticket, display).await {
                        break;
                    }
                }
            }
        }

        debug!("Ticker de progreso terminado en guild {}", guild_id);
    }

    /// Un tick del panel. Devuelve `false` cuando el panel ya no es válido
    /// (sesión terminada, otro track u otro mensaje) y el ticker debe parar.
    pub async fn tick_progress(
        &self,
        guild_id: GuildId,
        ticket: TrackTicket,
        display: DisplayRef,
    ) -> bool {
        let handle = {
            let sessions = self.sessions.lock();
            match sessions.get(guild_id) {
                Some(session) if session.shows_display(ticket, display) => session.handle(),
                _ => return false,
            }
        };

        let Some(handle) = handle else {
            return false;
        };

        if handle.status().await != PlayerStatus::Playing {
            return true;
        }

        let view = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(guild_id) {
                Some(session) if session.shows_display(ticket, display) => {
                    session.advance_progress(self.settings.progress_tick.as_secs().max(1))
                }
                _ => None,
            }
        };

        let Some(view) = view else {
            return false;
        };

        if let Err(e) = self.surface.update(&display, &view).await {
            warn!("⚠️ {}", MusicError::DisplayUpdate(e.to_string()));
        }

        true
    }

    /// Vuelve a dibujar el panel actual (tras pausar, activar loop...)
    pub async fn refresh_panel(&self, guild_id: GuildId) {
        let target = {
            let sessions = self.sessions.lock();
            sessions.get(guild_id).and_then(|session| {
                let display = session.progress()?.display;
                session.panel_view().map(|view| (display, view))
            })
        };

        if let Some((display, view)) = target {
            if let Err(e) = self.surface.update(&display, &view).await {
                warn!("⚠️ {}", MusicError::DisplayUpdate(e.to_string()));
            }
        }
    }

    fn session_handle(&self, guild_id: GuildId) -> MusicResult<Arc<dyn PlaybackHandle>> {
        let sessions = self.sessions.lock();
        let session = sessions.get(guild_id).ok_or(MusicError::NoSession)?;
        session.handle().ok_or(MusicError::NotPlaying)
    }

    /// Handle de un track que ya suena; mientras carga, el handle todavía
    /// apunta al track anterior y detenerlo no produce señal
    fn started_handle(session: &GuildSession) -> MusicResult<Arc<dyn PlaybackHandle>> {
        match session.state() {
            PlaybackState::Playing | PlaybackState::Paused => {
                session.handle().ok_or(MusicError::NotPlaying)
            }
            PlaybackState::Loading | PlaybackState::Advancing => Err(MusicError::NotPlaying),
        }
    }

    fn set_paused(&self, guild_id: GuildId, paused: bool) {
        if let Some(session) = self.sessions.lock().get_mut(guild_id) {
            session.set_paused(paused);
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<PauseOutcome> {
        let handle = self.session_handle(guild_id)?;
        match handle.status().await {
            PlayerStatus::Paused => Ok(PauseOutcome::AlreadyPaused),
            PlayerStatus::Idle => Err(MusicError::NotPlaying),
            PlayerStatus::Playing => {
                handle.pause()?;
                self.set_paused(guild_id, true);
                info!("⏸️ Reproducción pausada en guild {}", guild_id);
                Ok(PauseOutcome::Paused)
            }
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<PauseOutcome> {
        let handle = self.session_handle(guild_id)?;
        match handle.status().await {
            PlayerStatus::Playing => Ok(PauseOutcome::AlreadyPlaying),
            PlayerStatus::Idle => Err(MusicError::NotPlaying),
            PlayerStatus::Paused => {
                handle.unpause()?;
                self.set_paused(guild_id, false);
                info!("▶️ Reproducción reanudada en guild {}", guild_id);
                Ok(PauseOutcome::Resumed)
            }
        }
    }

    /// Un solo control: pausa si suena, reanuda si está pausado
    pub async fn toggle_pause(&self, guild_id: GuildId) -> MusicResult<PauseOutcome> {
        let handle = self.session_handle(guild_id)?;
        if handle.status().await == PlayerStatus::Paused {
            self.resume(guild_id).await
        } else {
            self.pause(guild_id).await
        }
    }

    /// Detiene el track actual; el avance ocurre al llegar la señal idle
    pub fn skip(&self, guild_id: GuildId) -> MusicResult<Option<Song>> {
        let (handle, current) = {
            let sessions = self.sessions.lock();
            let session = sessions.get(guild_id).ok_or(MusicError::NoSession)?;
            let handle = Self::started_handle(session)?;
            (handle, session.current().cloned())
        };

        handle.stop()?;
        info!("⏭️ Canción saltada en guild {}", guild_id);
        Ok(current)
    }

    /// Devuelve la última canción del historial al frente de la cola y
    /// detiene el track actual para que se cargue, también con loop activo
    pub fn previous(&self, guild_id: GuildId) -> MusicResult<Song> {
        let (handle, previous) = {
            let mut sessions = self.sessions.lock();
            let session = sessions.get_mut(guild_id).ok_or(MusicError::NoSession)?;
            let handle = Self::started_handle(session)?;
            (handle, session.restore_previous()?)
        };

        handle.stop()?;
        info!("🔙 Reproduciendo anterior: {}", previous.title);
        Ok(previous)
    }

    /// Vacía la cola, detiene el track y elimina la sesión sin pasar por el
    /// avance normal
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let mut session = {
            let mut sessions = self.sessions.lock();
            let session = sessions.remove(guild_id).ok_or(MusicError::NoSession)?;
            sessions.record_stop(guild_id);
            session
        };

        session.clear_pending();
        if let Some(handle) = session.handle() {
            if let Err(e) = handle.stop() {
                warn!("⚠️ Error al detener el track: {}", e);
            }
        }
        drop(session);

        self.transport.leave(guild_id).await;
        info!(
            "⏹️ Reproducción detenida en guild {} ({} sesiones activas)",
            guild_id,
            self.active_sessions()
        );
        Ok(())
    }

    pub fn toggle_loop(&self, guild_id: GuildId) -> MusicResult<bool> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(guild_id).ok_or(MusicError::NoSession)?;
        Ok(session.toggle_loop())
    }

    pub fn shuffle(&self, guild_id: GuildId) -> MusicResult<usize> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(guild_id).ok_or(MusicError::NoSession)?;
        session.shuffle_pending(&mut rand::thread_rng())
    }

    pub fn queue(&self, guild_id: GuildId) -> MusicResult<QueueSnapshot> {
        let sessions = self.sessions.lock();
        let session = sessions.get(guild_id).ok_or(MusicError::NoSession)?;
        Ok(session.snapshot())
    }

    pub fn now_playing(&self, guild_id: GuildId) -> MusicResult<PanelView> {
        let sessions = self.sessions.lock();
        let session = sessions.get(guild_id).ok_or(MusicError::NoSession)?;
        session.panel_view().ok_or(MusicError::NotPlaying)
    }

    /// Aplica un botón del panel si sus controles siguen abiertos
    pub async fn control(
        &self,
        guild_id: GuildId,
        action: ControlAction,
    ) -> MusicResult<ControlOutcome> {
        {
            let sessions = self.sessions.lock();
            let session = sessions.get(guild_id).ok_or(MusicError::NoSession)?;
            if !session.controls_open(Instant::now()) {
                return Err(MusicError::ControlsExpired);
            }
        }

        let outcome = match action {
            ControlAction::Previous => ControlOutcome::Previous(self.previous(guild_id)?),
            ControlAction::TogglePause => ControlOutcome::Pause(self.toggle_pause(guild_id).await?),
            ControlAction::Skip => ControlOutcome::Skipped(self.skip(guild_id)?),
            ControlAction::ToggleLoop => ControlOutcome::Loop(self.toggle_loop(guild_id)?),
            ControlAction::Shuffle => ControlOutcome::Shuffled(self.shuffle(guild_id)?),
            ControlAction::ShowQueue => ControlOutcome::Queue(self.queue(guild_id)?),
        };

        if matches!(
            outcome,
            ControlOutcome::Pause(_) | ControlOutcome::Loop(_) | ControlOutcome::Shuffled(_)
        ) {
            self.refresh_panel(guild_id).await;
        }

        Ok(outcome)
    }

    async fn leave_if_idle(&self, guild_id: GuildId) {
        if !self.has_session(guild_id) {
            self.transport.leave(guild_id).await;
        }
    }

    #[cfg(test)]
    pub(crate) fn with_session<R>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut GuildSession) -> R,
    ) -> Option<R> {
        self.sessions.lock().get_mut(guild_id).map(f)
    }
}
