use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use crate::audio::driver::ControlAction;

/// IDs personalizados para los botones
pub mod button_ids {
    pub const PREVIOUS: &str = "music_previous";
    pub const PLAY_PAUSE: &str = "music_toggle_pause";
    pub const SKIP: &str = "music_skip";
    pub const LOOP_TRACK: &str = "music_loop";
    pub const SHUFFLE: &str = "music_shuffle";
    pub const QUEUE: &str = "music_queue";
}

impl ControlAction {
    pub fn custom_id(self) -> &'static str {
        match self {
            ControlAction::Previous => button_ids::PREVIOUS,
            ControlAction::TogglePause => button_ids::PLAY_PAUSE,
            ControlAction::Skip => button_ids::SKIP,
            ControlAction::ToggleLoop => button_ids::LOOP_TRACK,
            ControlAction::Shuffle => button_ids::SHUFFLE,
            ControlAction::ShowQueue => button_ids::QUEUE,
        }
    }

    /// `None` para botones que no son del panel de música
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            button_ids::PREVIOUS => Some(ControlAction::Previous),
            button_ids::PLAY_PAUSE => Some(ControlAction::TogglePause),
            button_ids::SKIP => Some(ControlAction::Skip),
            button_ids::LOOP_TRACK => Some(ControlAction::ToggleLoop),
            button_ids::SHUFFLE => Some(ControlAction::Shuffle),
            button_ids::QUEUE => Some(ControlAction::ShowQueue),
            _ => None,
        }
    }
}

/// Crea los controles del panel de reproducción.
///
/// Discord admite hasta 5 botones por fila, así que van en dos filas:
/// transporte arriba, modos de cola abajo.
pub fn create_player_controls(is_paused: bool, is_looping: bool) -> Vec<CreateActionRow> {
    let play_pause_emoji = if is_paused { '▶' } else { '⏸' };
    let loop_style = if is_looping {
        ButtonStyle::Success
    } else {
        ButtonStyle::Secondary
    };

    let previous_btn = CreateButton::new(button_ids::PREVIOUS)
        .emoji('⏮')
        .style(ButtonStyle::Secondary);

    let play_pause_btn = CreateButton::new(button_ids::PLAY_PAUSE)
        .emoji(play_pause_emoji)
        .style(ButtonStyle::Primary);

    let skip_btn = CreateButton::new(button_ids::SKIP)
        .emoji('⏭')
        .style(ButtonStyle::Secondary);

    let loop_btn = CreateButton::new(button_ids::LOOP_TRACK)
        .emoji('🔂')
        .style(loop_style);

    let shuffle_btn = CreateButton::new(button_ids::SHUFFLE)
        .emoji('🔀')
        .style(ButtonStyle::Secondary);

    let queue_btn = CreateButton::new(button_ids::QUEUE)
        .emoji('📋')
        .label("Cola")
        .style(ButtonStyle::Secondary);

    vec![
        CreateActionRow::Buttons(vec![previous_btn, play_pause_btn, skip_btn]),
        CreateActionRow::Buttons(vec![loop_btn, shuffle_btn, queue_btn]),
    ]
}
