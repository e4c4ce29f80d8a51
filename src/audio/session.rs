use rand::{seq::SliceRandom, Rng};
use serenity::model::id::{ChannelId, GuildId};
use std::{collections::VecDeque, sync::Arc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{DisplayRef, PlaybackHandle, SessionId, TrackTicket};
use crate::error::{MusicError, MusicResult};

/// Canción resuelta por la búsqueda; inmutable desde entonces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub title: String,
    pub url: String,
    pub duration_secs: u64,
}

impl Song {
    pub fn new(title: impl Into<String>, url: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Handle creado, stream todavía sin adjuntar
    Loading,
    Playing,
    Paused,
    /// Señal terminal recibida, eligiendo la siguiente canción
    Advancing,
}

/// Panel de progreso en vivo de la canción actual.
///
/// Es dueño del token del ticker: al reemplazarse o soltarse el estado, el
/// ticker se detiene.
#[derive(Debug)]
pub struct ProgressState {
    pub elapsed_secs: u64,
    pub display: DisplayRef,
    ticker: CancellationToken,
}

impl Drop for ProgressState {
    fn drop(&mut self) {
        self.ticker.cancel();
    }
}

/// Datos necesarios para dibujar el panel de "now playing"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub title: String,
    pub url: String,
    pub elapsed_secs: u64,
    pub duration_secs: u64,
    pub paused: bool,
    pub loop_current: bool,
    pub pending: usize,
    pub up_next: Option<String>,
}

/// Copia de la cola para listarla
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub current: Option<Song>,
    pub pending: Vec<Song>,
    pub loop_current: bool,
    pub paused: bool,
}

/// Estado de reproducción de una guild
pub struct GuildSession {
    id: SessionId,
    guild_id: GuildId,
    text_channel: ChannelId,
    voice_channel: ChannelId,
    pending: VecDeque<Song>,
    history: Vec<Song>,
    current: Option<Song>,
    loop_current: bool,
    // `previous` pidió otra canción: el próximo avance no repite la actual
    leave_current: bool,
    state: PlaybackState,
    epoch: u64,
    handle: Option<Arc<dyn PlaybackHandle>>,
    progress: Option<ProgressState>,
    controls_expire_at: Option<Instant>,
    max_history: usize,
}

impl GuildSession {
    pub fn new(
        id: SessionId,
        guild_id: GuildId,
        text_channel: ChannelId,
        voice_channel: ChannelId,
        first: Song,
    ) -> Self {
        Self {
            id,
            guild_id,
            text_channel,
            voice_channel,
            pending: VecDeque::from([first]),
            history: Vec::new(),
            current: None,
            loop_current: false,
            leave_current: false,
            state: PlaybackState::Loading,
            epoch: 0,
            handle: None,
            progress: None,
            controls_expire_at: None,
            max_history: 50,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn text_channel(&self) -> ChannelId {
        self.text_channel
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn pending(&self) -> &VecDeque<Song> {
        &self.pending
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Song] {
        &self.history
    }

    pub fn progress(&self) -> Option<&ProgressState> {
        self.progress.as_ref()
    }

    pub fn ticket(&self) -> TrackTicket {
        TrackTicket {
            session: self.id,
            epoch: self.epoch,
        }
    }

    pub fn handle(&self) -> Option<Arc<dyn PlaybackHandle>> {
        self.handle.clone()
    }

    pub fn attach_handle(&mut self, handle: Arc<dyn PlaybackHandle>) {
        self.handle = Some(handle);
    }

    /// Una señal con `ticket` pertenece al track actual y todavía no fue atendida
    pub fn accepts(&self, ticket: TrackTicket) -> bool {
        self.ticket() == ticket && self.state != PlaybackState::Advancing
    }

    /// El panel `display` sigue siendo el del track `ticket`
    pub fn shows_display(&self, ticket: TrackTicket, display: DisplayRef) -> bool {
        self.accepts(ticket)
            && self
                .progress
                .as_ref()
                .is_some_and(|progress| progress.display == display)
    }

    /// Agrega al final de la cola; devuelve la posición (1 = la siguiente)
    pub fn enqueue(&mut self, song: Song, max_size: usize) -> MusicResult<usize> {
        if self.pending.len() >= max_size {
            return Err(MusicError::QueueFull(max_size));
        }

        info!("➕ Agregado a la cola: {}", song.title);
        self.pending.push_back(song);
        Ok(self.pending.len())
    }

    /// Fin natural del track: pasa al historial, salvo en modo loop
    pub fn finish_current(&mut self) {
        self.state = PlaybackState::Advancing;

        if self.loop_current && !self.leave_current {
            if let Some(current) = &self.current {
                info!("🔂 Repitiendo track: {}", current.title);
            }
            return;
        }

        if let Some(current) = self.current.take() {
            self.add_to_history(current);
        }
    }

    /// Track fallido: se descarta sin pasar por el historial
    pub fn drop_current(&mut self) {
        self.state = PlaybackState::Advancing;
        if let Some(failed) = self.current.take() {
            debug!("🗑️ Descartando track fallido: {}", failed.title);
        }
    }

    /// Arma la siguiente canción: la actual si sigue puesta (loop), o la
    /// primera de la cola. Devuelve `None` cuando la cola se agotó.
    pub fn begin_next(&mut self) -> Option<(Song, TrackTicket)> {
        let next = match self.current.take() {
            Some(rearmed) => rearmed,
            None => self.pending.pop_front()?,
        };

        self.current = Some(next.clone());
        self.leave_current = false;
        self.epoch += 1;
        self.state = PlaybackState::Loading;
        self.progress = None;
        self.controls_expire_at = None;

        Some((next, self.ticket()))
    }

    pub fn mark_playing(&mut self, controls_expire_at: Instant) {
        self.state = PlaybackState::Playing;
        self.controls_expire_at = Some(controls_expire_at);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.state = if paused {
                PlaybackState::Paused
            } else {
                PlaybackState::Playing
            };
        }
    }

    pub fn controls_open(&self, now: Instant) -> bool {
        self.controls_expire_at.is_some_and(|deadline| now <= deadline)
    }

    pub fn attach_display(&mut self, display: DisplayRef, ticker: CancellationToken) {
        self.progress = Some(ProgressState {
            elapsed_secs: 0,
            display,
            ticker,
        });
    }

    /// Suma `secs` al contador del panel y devuelve la vista actualizada
    pub fn advance_progress(&mut self, secs: u64) -> Option<PanelView> {
        let progress = self.progress.as_mut()?;
        progress.elapsed_secs += secs;
        self.panel_view()
    }

    /// Saca la última canción del historial y la pone al frente de la cola
    pub fn restore_previous(&mut self) -> MusicResult<Song> {
        let previous = self.history.pop().ok_or(MusicError::NoPrevious)?;
        self.pending.push_front(previous.clone());
        self.leave_current = true;
        Ok(previous)
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_current = !self.loop_current;
        if self.loop_current {
            info!("🔂 Repetir canción activado");
        } else {
            info!("➡️ Repetición desactivada");
        }
        self.loop_current
    }

    /// Mezcla la cola pendiente; la canción actual no se toca
    pub fn shuffle_pending<R: Rng + ?Sized>(&mut self, rng: &mut R) -> MusicResult<usize> {
        let len = self.pending.len();
        if len < 2 {
            return Err(MusicError::NotEnoughToShuffle(len));
        }

        self.pending.make_contiguous().shuffle(rng);
        info!("🔀 Cola mezclada");
        Ok(len)
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
        info!("🗑️ Cola limpiada");
    }

    pub fn panel_view(&self) -> Option<PanelView> {
        let current = self.current.as_ref()?;

        Some(PanelView {
            title: current.title.clone(),
            url: current.url.clone(),
            elapsed_secs: self.progress.as_ref().map_or(0, |p| p.elapsed_secs),
            duration_secs: current.duration_secs,
            paused: self.state == PlaybackState::Paused,
            loop_current: self.loop_current,
            pending: self.pending.len(),
            up_next: self.pending.front().map(|song| song.title.clone()),
        })
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.current.clone(),
            pending: self.pending.iter().cloned().collect(),
            loop_current: self.loop_current,
            paused: self.state == PlaybackState::Paused,
        }
    }

    fn add_to_history(&mut self, song: Song) {
        self.history.push(song);

        // Mantener solo los últimos N items
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }
    }
}
