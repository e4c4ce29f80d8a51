//! Dobles de prueba para el driver: handle, transporte y panel en memoria.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;

use super::{
    driver::{DriverSettings, PlayRequest, PlaybackDriver},
    session::{PanelView, Song},
    DisplayRef, NowPlayingSurface, PlaybackEvent, PlaybackHandle, PlaybackSignal, PlayerStatus,
    StreamOptions, TrackTicket, VoiceTransport,
};
use crate::{
    config::PanelMode,
    error::{MusicError, MusicResult},
    sources::{MediaResolver, SearchHit},
};

pub fn guild() -> GuildId {
    GuildId::new(100)
}

pub fn request(query: &str) -> PlayRequest {
    PlayRequest {
        guild_id: guild(),
        voice_channel: ChannelId::new(200),
        text_channel: ChannelId::new(300),
        query: query.to_string(),
    }
}

pub fn test_settings(panel_mode: PanelMode) -> DriverSettings {
    DriverSettings {
        panel_mode,
        progress_tick: Duration::from_secs(10),
        controls_ttl: Duration::from_secs(300),
        max_queue_size: 100,
        default_song_duration: 180,
        stream: StreamOptions::default(),
    }
}

/// Handle que registra lo que se le pide sin emitir señales por su cuenta
#[derive(Default)]
pub struct FakeHandle {
    played: Mutex<Vec<(String, TrackTicket)>>,
    status: Mutex<Option<PlayerStatus>>,
    failing_urls: Mutex<Vec<String>>,
    stops: AtomicUsize,
}

impl FakeHandle {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().iter().map(|(title, _)| title.clone()).collect()
    }

    pub fn last_ticket(&self) -> Option<TrackTicket> {
        self.played.lock().last().map(|(_, ticket)| *ticket)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn status_now(&self) -> PlayerStatus {
        self.status.lock().unwrap_or(PlayerStatus::Idle)
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().push(url.to_string());
    }
}

#[async_trait]
impl PlaybackHandle for FakeHandle {
    async fn play(&self, song: &Song, ticket: TrackTicket, _options: &StreamOptions)
        -> MusicResult<()> {
        if self.failing_urls.lock().contains(&song.url) {
            return Err(MusicError::Stream(format!("no se pudo abrir {}", song.url)));
        }

        self.played.lock().push((song.title.clone(), ticket));
        *self.status.lock() = Some(PlayerStatus::Playing);
        Ok(())
    }

    fn pause(&self) -> MusicResult<()> {
        *self.status.lock() = Some(PlayerStatus::Paused);
        Ok(())
    }

    fn unpause(&self) -> MusicResult<()> {
        *self.status.lock() = Some(PlayerStatus::Playing);
        Ok(())
    }

    fn stop(&self) -> MusicResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.status.lock() = Some(PlayerStatus::Idle);
        Ok(())
    }

    async fn status(&self) -> PlayerStatus {
        self.status_now()
    }
}

pub struct FakeTransport {
    handle: Arc<FakeHandle>,
    fail_join: AtomicBool,
    join_gate: watch::Sender<bool>,
    joins: watch::Sender<usize>,
    leaves: Mutex<Vec<GuildId>>,
}

impl FakeTransport {
    pub fn new(handle: Arc<FakeHandle>) -> Self {
        Self {
            handle,
            fail_join: AtomicBool::new(false),
            join_gate: watch::channel(true).0,
            joins: watch::channel(0).0,
            leaves: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next_join(&self) {
        self.fail_join.store(true, Ordering::SeqCst);
    }

    /// Las uniones siguientes quedan colgadas hasta `release_joins`
    pub fn hold_joins(&self) {
        self.join_gate.send_replace(false);
    }

    pub fn release_joins(&self) {
        self.join_gate.send_replace(true);
    }

    pub async fn wait_until_joins(&self, count: usize) {
        let mut rx = self.joins.subscribe();
        let _ = rx.wait_for(|started| *started >= count).await;
    }

    pub fn joins(&self) -> usize {
        *self.joins.borrow()
    }

    pub fn leaves(&self) -> Vec<GuildId> {
        self.leaves.lock().clone()
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn join(&self, _guild_id: GuildId, _channel_id: ChannelId)
        -> MusicResult<Arc<dyn PlaybackHandle>> {
        let mut gate = self.join_gate.subscribe();
        self.joins.send_modify(|started| *started += 1);
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_join.swap(false, Ordering::SeqCst) {
            return Err(MusicError::Connection("timeout".to_string()));
        }
        Ok(self.handle.clone())
    }

    async fn leave(&self, guild_id: GuildId) {
        self.leaves.lock().push(guild_id);
    }
}

#[derive(Default)]
pub struct FakeSurface {
    announcements: Mutex<Vec<String>>,
    renders: Mutex<Vec<(DisplayRef, PanelView)>>,
    updates: Mutex<Vec<(DisplayRef, PanelView)>>,
    fail_updates: AtomicBool,
    next_message: AtomicU64,
}

impl FakeSurface {
    pub fn announcements(&self) -> Vec<String> {
        self.announcements.lock().clone()
    }

    pub fn renders(&self) -> Vec<PanelView> {
        self.renders.lock().iter().map(|(_, view)| view.clone()).collect()
    }

    pub fn last_display(&self) -> Option<DisplayRef> {
        self.renders.lock().last().map(|(display, _)| *display)
    }

    pub fn updates(&self) -> Vec<(DisplayRef, PanelView)> {
        self.updates.lock().clone()
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NowPlayingSurface for FakeSurface {
    async fn announce(&self, _channel_id: ChannelId, text: &str) -> MusicResult<()> {
        self.announcements.lock().push(text.to_string());
        Ok(())
    }

    async fn render(&self, channel_id: ChannelId, panel: &PanelView) -> MusicResult<DisplayRef> {
        let id = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        let display = DisplayRef {
            channel_id,
            message_id: MessageId::new(id),
        };
        self.renders.lock().push((display, panel.clone()));
        Ok(display)
    }

    async fn update(&self, display: &DisplayRef, panel: &PanelView) -> MusicResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(MusicError::DisplayUpdate("Unknown Message".to_string()));
        }
        self.updates.lock().push((*display, panel.clone()));
        Ok(())
    }
}

/// Resolver que se bloquea hasta que se abre la compuerta
#[derive(Clone)]
pub struct GatedResolver {
    gate: Arc<watch::Sender<bool>>,
    searches: Arc<watch::Sender<usize>>,
}

impl GatedResolver {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(watch::channel(true).0),
            searches: Arc::new(watch::channel(0).0),
        }
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn close(&self) {
        self.gate.send_replace(false);
    }

    /// Espera a que hayan empezado `count` búsquedas
    pub async fn wait_until_searches(&self, count: usize) {
        let mut rx = self.searches.subscribe();
        let _ = rx.wait_for(|started| *started >= count).await;
    }
}

#[async_trait]
impl MediaResolver for GatedResolver {
    async fn search(&self, query: &str) -> MusicResult<Vec<SearchHit>> {
        let mut gate = self.gate.subscribe();
        self.searches.send_modify(|started| *started += 1);
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| MusicError::Search(e.to_string()))?;

        let title = match query {
            "x" => "A",
            "y" => "B",
            _ => return Ok(Vec::new()),
        };
        Ok(vec![SearchHit {
            title: title.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", title),
            is_live: false,
            duration_secs: Some(120),
        }])
    }
}

/// Driver cableado con los dobles de arriba
pub struct Harness {
    pub driver: Arc<PlaybackDriver>,
    pub handle: Arc<FakeHandle>,
    pub transport: Arc<FakeTransport>,
    pub surface: Arc<FakeSurface>,
}

impl Harness {
    pub fn new<R: MediaResolver + 'static>(resolver: R, panel_mode: PanelMode) -> Self {
        Self::with_settings(resolver, test_settings(panel_mode))
    }

    pub fn with_settings<R: MediaResolver + 'static>(resolver: R, settings: DriverSettings) -> Self {
        let handle = Arc::new(FakeHandle::default());
        let transport = Arc::new(FakeTransport::new(handle.clone()));
        let surface = Arc::new(FakeSurface::default());
        let driver = PlaybackDriver::new(
            Arc::new(resolver),
            transport.clone(),
            surface.clone(),
            settings,
        );

        Self {
            driver,
            handle,
            transport,
            surface,
        }
    }

    /// Simula la señal terminal del último track arrancado
    pub async fn emit(&self, signal: PlaybackSignal) {
        let ticket = self
            .handle
            .last_ticket()
            .expect("ningún track arrancado todavía");
        self.driver
            .handle_event(PlaybackEvent {
                guild_id: guild(),
                ticket,
                signal,
            })
            .await;
    }

    pub async fn emit_idle(&self) {
        self.emit(PlaybackSignal::Idle).await;
    }
}
