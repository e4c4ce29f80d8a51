//! # Bot Module
//!
//! Serenity event handler for the music bot.
//!
//! This module contains the chat-facing side of the bot:
//! - Prefix command parsing ([`commands`])
//! - Command and button handlers ([`handlers`])
//! - The Discord implementation of the now-playing surface ([`surface`])
//!
//! ## Architecture
//!
//! [`MusicBot`] implements Serenity's [`EventHandler`] trait and forwards every
//! command to the shared [`PlaybackDriver`]. The driver is built in `main` and
//! injected here; the bot holds no playback state of its own.

use serenity::{
    all::{Context, EventHandler, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;
pub mod surface;

use crate::{audio::driver::PlaybackDriver, config::Config};

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (prefix, panel mode)
/// - `driver`: Playback driver shared with the voice event loop
pub struct MusicBot {
    config: Arc<Config>,
    driver: Arc<PlaybackDriver>,
}

impl MusicBot {
    pub fn new(config: Config, driver: Arc<PlaybackDriver>) -> Self {
        Self {
            config: Arc::new(config),
            driver,
        }
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    /// Called when the bot is ready and connected to Discord.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
        info!(
            "💬 Prefijo de comandos: '{}' • modo {:?}",
            self.config.command_prefix, self.config.panel_mode
        );
    }

    /// Handles prefix commands from guild text channels.
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error manejando mensaje: {:?}", e);
        }
    }

    /// Handles button presses on the now-playing panel.
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component_interaction) = interaction {
            if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await {
                error!("Error manejando componente: {:?}", e);
            }
        }
    }

    /// Stops the guild session when the bot is forcibly disconnected.
    ///
    /// # Behaviors
    ///
    /// - **Bot disconnected**: the session is stopped and its queue cleared
    /// - **Anything else**: ignored
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);

        if self.driver.has_session(guild_id) {
            if let Err(e) = self.driver.stop(guild_id).await {
                warn!("⚠️ Error al detener reproducción tras desconexión: {}", e);
            }
        }
    }
}
