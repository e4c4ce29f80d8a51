use async_trait::async_trait;
use serenity::{
    builder::{CreateMessage, EditMessage},
    http::Http,
    model::id::ChannelId,
};
use std::sync::Arc;

use crate::{
    audio::{session::PanelView, DisplayRef, NowPlayingSurface},
    error::{MusicError, MusicResult},
    ui::{buttons, embeds},
};

/// Anuncios y panel de progreso publicados por HTTP
pub struct SerenityPanel {
    http: Arc<Http>,
}

impl SerenityPanel {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl NowPlayingSurface for SerenityPanel {
    async fn announce(&self, channel_id: ChannelId, text: &str) -> MusicResult<()> {
        channel_id
            .say(&self.http, text)
            .await
            .map_err(|e| MusicError::DisplayUpdate(e.to_string()))?;
        Ok(())
    }

    async fn render(&self, channel_id: ChannelId, panel: &PanelView) -> MusicResult<DisplayRef> {
        let message = CreateMessage::new()
            .embed(embeds::create_now_playing_embed(panel))
            .components(buttons::create_player_controls(panel.paused, panel.loop_current));

        let sent = channel_id
            .send_message(&self.http, message)
            .await
            .map_err(|e| MusicError::DisplayUpdate(e.to_string()))?;

        Ok(DisplayRef {
            channel_id,
            message_id: sent.id,
        })
    }

    async fn update(&self, display: &DisplayRef, panel: &PanelView) -> MusicResult<()> {
        let edit = EditMessage::new()
            .embed(embeds::create_now_playing_embed(panel))
            .components(buttons::create_player_controls(panel.paused, panel.loop_current));

        display
            .channel_id
            .edit_message(&self.http, display.message_id, edit)
            .await
            .map_err(|e| MusicError::DisplayUpdate(e.to_string()))?;
        Ok(())
    }
}
