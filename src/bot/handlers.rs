use anyhow::Result;
use serenity::{
    builder::{CreateEmbed, CreateInteractionResponseFollowup, CreateMessage},
    model::{
        application::ComponentInteraction,
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{debug, info, warn};

use super::{
    commands::{self, Command},
    MusicBot,
};
use crate::{
    audio::driver::{ControlAction, ControlOutcome, Enqueued, PauseOutcome, PlayRequest},
    config::PanelMode,
    error::{MusicError, MusicResult},
    ui::embeds,
};

/// Respuesta a un comando o botón
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Embed(CreateEmbed),
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

/// Punto de entrada para mensajes de texto del servidor
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &MusicBot) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let Some(command) = commands::parse(&msg.content, &bot.config.command_prefix) else {
        return Ok(());
    };

    info!(
        "📝 Comando {}{} usado por {} en guild {}",
        bot.config.command_prefix,
        command.name(),
        msg.author.name,
        guild_id
    );

    let reply = match run_command(ctx, msg, guild_id, command, bot).await {
        Ok(reply) => reply,
        Err(e) if e.is_user_visible() => Some(Reply::Text(e.user_message())),
        Err(e) => {
            warn!("⚠️ Comando fallido en guild {}: {}", guild_id, e);
            None
        }
    };

    if let Some(reply) = reply {
        send_reply(ctx, msg.channel_id, reply).await?;
    }

    Ok(())
}

async fn run_command(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    command: Command,
    bot: &MusicBot,
) -> MusicResult<Option<Reply>> {
    let driver = &bot.driver;
    let mode = bot.config.panel_mode;

    let reply = match command {
        Command::Play(query) => return handle_play(ctx, msg, guild_id, query, bot).await,
        Command::Skip => skip_text(driver.skip(guild_id)?.map(|song| song.title)).into(),
        Command::Stop => {
            driver.stop(guild_id).await?;
            "⏹️ Reproducción detenida y cola limpiada.".into()
        }
        Command::Pause => pause_text(driver.pause(guild_id).await?).into(),
        Command::Resume => pause_text(driver.resume(guild_id).await?).into(),
        Command::Previous => {
            format!("⏮️ Volviendo a **{}**.", driver.previous(guild_id)?.title).into()
        }
        Command::Queue => {
            let queue = driver.queue(guild_id)?;
            match mode {
                PanelMode::Enhanced => Reply::Embed(embeds::create_queue_embed(&queue)),
                PanelMode::Plain => Reply::Text(embeds::queue_text(&queue)),
            }
        }
        Command::Loop => loop_text(driver.toggle_loop(guild_id)?).into(),
        Command::Shuffle => shuffle_text(driver.shuffle(guild_id)?).into(),
        Command::NowPlaying => {
            let panel = driver.now_playing(guild_id)?;
            match mode {
                PanelMode::Enhanced => Reply::Embed(embeds::create_now_playing_embed(&panel)),
                PanelMode::Plain => Reply::Text(embeds::now_playing_text(&panel)),
            }
        }
        Command::Help => Reply::Embed(embeds::create_help_embed(
            &bot.config.command_prefix,
            mode == PanelMode::Enhanced,
        )),
    };

    Ok(Some(reply))
}

async fn handle_play(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    query: String,
    bot: &MusicBot,
) -> MusicResult<Option<Reply>> {
    if query.is_empty() {
        return Ok(Some(Reply::Text(format!(
            "❌ Uso: `{}play <canción o URL>`",
            bot.config.command_prefix
        ))));
    }

    let voice_channel = get_user_voice_channel(ctx, guild_id, msg.author.id)?;
    check_voice_permissions(ctx, guild_id, voice_channel)?;

    let request = PlayRequest {
        guild_id,
        voice_channel,
        text_channel: msg.channel_id,
        query,
    };

    let reply = match bot.driver.enqueue(request).await? {
        // El anuncio o el panel de la canción ya lo publica el driver
        Enqueued::Started(_) => None,
        Enqueued::Queued { song, position } => Some(Reply::Text(format!(
            "➕ Agregado a la cola (#{}): **{}**",
            position, song.title
        ))),
        Enqueued::Cancelled(song) => Some(Reply::Text(format!(
            "⏹️ La reproducción se detuvo antes de agregar **{}**.",
            song.title
        ))),
    };

    Ok(reply)
}

/// Maneja los botones del panel de reproducción
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &MusicBot,
) -> Result<()> {
    let Some(action) = ControlAction::from_custom_id(&component.data.custom_id) else {
        debug!("Componente ignorado: {}", component.data.custom_id);
        return Ok(());
    };
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    // Confirmar la interacción antes de tocar la sesión
    component.defer(&ctx.http).await?;

    let reply = match bot.driver.control(guild_id, action).await {
        Ok(outcome) => control_reply(outcome),
        Err(e) => {
            if !e.is_user_visible() {
                warn!("⚠️ Control fallido en guild {}: {}", guild_id, e);
            }
            Reply::Text(control_error_text(&e))
        }
    };

    let followup = match reply {
        Reply::Text(text) => CreateInteractionResponseFollowup::new().content(text),
        Reply::Embed(embed) => CreateInteractionResponseFollowup::new().embed(embed),
    };
    component
        .create_followup(&ctx.http, followup.ephemeral(true))
        .await?;

    Ok(())
}

fn control_reply(outcome: ControlOutcome) -> Reply {
    match outcome {
        ControlOutcome::Previous(song) => format!("⏮️ Volviendo a **{}**.", song.title).into(),
        ControlOutcome::Pause(outcome) => pause_text(outcome).into(),
        ControlOutcome::Skipped(song) => skip_text(song.map(|s| s.title)).into(),
        ControlOutcome::Loop(enabled) => loop_text(enabled).into(),
        ControlOutcome::Shuffled(count) => shuffle_text(count).into(),
        ControlOutcome::Queue(queue) => Reply::Embed(embeds::create_queue_embed(&queue)),
    }
}

/// Un botón siempre recibe respuesta; los errores internos no se detallan
fn control_error_text(e: &MusicError) -> String {
    if e.is_user_visible() {
        e.user_message()
    } else {
        "❌ No se pudo completar la acción.".to_string()
    }
}

async fn send_reply(ctx: &Context, channel_id: ChannelId, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(text) => {
            channel_id.say(&ctx.http, text).await?;
        }
        Reply::Embed(embed) => {
            channel_id
                .send_message(&ctx.http, CreateMessage::new().embed(embed))
                .await?;
        }
    }
    Ok(())
}

fn pause_text(outcome: PauseOutcome) -> &'static str {
    match outcome {
        PauseOutcome::Paused => "⏸️ Pausado.",
        PauseOutcome::AlreadyPaused => "⏸️ Ya está en pausa.",
        PauseOutcome::Resumed => "▶️ Reanudado.",
        PauseOutcome::AlreadyPlaying => "▶️ Ya se está reproduciendo.",
    }
}

fn skip_text(title: Option<String>) -> String {
    match title {
        Some(title) => format!("⏭️ Saltando **{}**.", title),
        None => "⏭️ Saltando.".to_string(),
    }
}

fn loop_text(enabled: bool) -> &'static str {
    if enabled {
        "🔂 Repetir canción activado."
    } else {
        "➡️ Repetir canción desactivado."
    }
}

fn shuffle_text(count: usize) -> String {
    format!("🔀 Cola mezclada ({} canciones).", count)
}

// Funciones auxiliares

fn get_user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> MusicResult<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or(MusicError::NotInVoice)?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or(MusicError::NotInVoice)?;

    Ok(channel_id)
}

/// Verifica CONNECT y SPEAK del bot en el canal. Si la caché no tiene los
/// datos necesarios se deja pasar y la unión decide.
fn check_voice_permissions(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> MusicResult<()> {
    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = guild_id.to_guild_cached(&ctx.cache) else {
        return Ok(());
    };
    let (Some(channel), Some(member)) = (guild.channels.get(&channel_id), guild.members.get(&bot_id))
    else {
        debug!("Permisos desconocidos para el canal {}, se permite", channel_id);
        return Ok(());
    };

    let permissions = guild.user_permissions_in(channel, member);
    if permissions.connect() && permissions.speak() {
        Ok(())
    } else {
        Err(MusicError::Permission(format!(
            "faltan CONNECT/SPEAK en el canal {}",
            channel_id
        )))
    }
}
