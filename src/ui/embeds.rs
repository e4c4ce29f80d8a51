use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::fmt::Write;

use crate::audio::{
    progress::{format_time, progress_line},
    session::{PanelView, QueueSnapshot},
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Music";

/// Máximo de canciones listadas en la cola
const QUEUE_PREVIEW: usize = 10;

/// Panel de "reproduciendo ahora" con la barra de progreso
pub fn create_now_playing_embed(panel: &PanelView) -> CreateEmbed {
    let (status, color) = if panel.paused {
        ("⏸️ En pausa", colors::WARNING_ORANGE)
    } else {
        ("▶️ Reproduciendo", colors::SUCCESS_GREEN)
    };

    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!(
            "**[{}]({})**\n\n{}",
            panel.title,
            panel.url,
            progress_line(panel.elapsed_secs, panel.duration_secs)
        ))
        .color(color)
        .field("Estado", status, true)
        .field(
            "🔂 Repetir",
            if panel.loop_current { "Activado" } else { "Desactivado" },
            true,
        )
        .field("📋 En cola", panel.pending.to_string(), true);

    if let Some(next) = &panel.up_next {
        embed = embed.field("⏭️ Siguiente", next, false);
    }

    embed
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Respuesta de `!nowplaying` en modo texto
pub fn now_playing_text(panel: &PanelView) -> String {
    let mut text = format!(
        "🎶 Reproduciendo: **{}**\n{}",
        panel.title,
        progress_line(panel.elapsed_secs, panel.duration_secs)
    );
    if panel.paused {
        text.push_str(" ⏸️");
    }
    if panel.loop_current {
        text.push_str(" 🔂");
    }
    text
}

pub fn create_queue_embed(queue: &QueueSnapshot) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if queue.current.is_none() && queue.pending.is_empty() {
        return embed
            .description("😴 **La cola está vacía**")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    if let Some(current) = &queue.current {
        let status = match (queue.paused, queue.loop_current) {
            (true, _) => "⏸️",
            (false, true) => "🔂",
            (false, false) => "▶️",
        };
        embed = embed.field(
            format!("{} Reproduciendo", status),
            format!("**{}** `[{}]`", current.title, format_time(current.duration_secs)),
            false,
        );
    }

    if !queue.pending.is_empty() {
        embed = embed.field("Próximas canciones", pending_lines(queue), false);
    }

    let total: u64 = queue.pending.iter().map(|song| song.duration_secs).sum();
    embed
        .field(
            "Información",
            format!(
                "**Total:** {} canciones • **Duración:** {}",
                queue.pending.len(),
                format_time(total)
            ),
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Cola en texto plano
pub fn queue_text(queue: &QueueSnapshot) -> String {
    if queue.current.is_none() && queue.pending.is_empty() {
        return "📭 La cola está vacía.".to_string();
    }

    let mut text = String::new();
    if let Some(current) = &queue.current {
        let marker = if queue.paused { "⏸️" } else { "▶️" };
        let _ = writeln!(text, "{} Ahora: **{}**", marker, current.title);
    }
    if queue.pending.is_empty() {
        text.push_str("📭 No hay más canciones en cola.");
    } else {
        text.push_str("📋 En cola:\n");
        text.push_str(&pending_lines(queue));
    }
    text.trim_end().to_string()
}

fn pending_lines(queue: &QueueSnapshot) -> String {
    let mut lines = String::new();
    for (i, song) in queue.pending.iter().take(QUEUE_PREVIEW).enumerate() {
        let _ = writeln!(
            lines,
            "**{}**. {} `[{}]`",
            i + 1,
            song.title,
            format_time(song.duration_secs)
        );
    }

    let hidden = queue.pending.len().saturating_sub(QUEUE_PREVIEW);
    if hidden > 0 {
        let _ = writeln!(lines, "... y {} más", hidden);
    }
    lines
}

/// Crea un embed de ayuda general
pub fn create_help_embed(prefix: &str, enhanced: bool) -> CreateEmbed {
    let mut playback = format!(
        "• `{p}play <canción o URL>` - Reproduce o agrega a la cola\n\
        • `{p}skip` - Salta la canción actual\n\
        • `{p}previous` - Vuelve a la canción anterior\n\
        • `{p}stop` - Detiene y limpia la cola",
        p = prefix
    );
    if !enhanced {
        let _ = write!(
            playback,
            "\n• `{p}pause` / `{p}resume` - Pausa y reanuda",
            p = prefix
        );
    }

    let mut embed = CreateEmbed::default()
        .title("🎵 Guild Music - Comandos")
        .color(colors::INFO_BLUE)
        .field("🎵 Reproducción", playback, false)
        .field(
            "📜 Cola",
            format!(
                "• `{p}queue` - Muestra la cola\n\
                • `{p}shuffle` - Mezcla la cola\n\
                • `{p}loop` - Repite la canción actual\n\
                • `{p}nowplaying` - Muestra la canción actual",
                p = prefix
            ),
            false,
        );

    if enhanced {
        embed = embed.field(
            "🎛️ Panel",
            "Usa los botones del panel para pausar, saltar, repetir o mezclar.",
            false,
        );
    }

    embed
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}
