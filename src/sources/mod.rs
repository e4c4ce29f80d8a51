pub mod youtube;

use async_trait::async_trait;

use crate::{audio::session::Song, error::MusicResult};

pub use youtube::YouTubeClient;

/// Resultado crudo de una búsqueda
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub is_live: bool,
    /// Duración reportada por la fuente, si la hay
    pub duration_secs: Option<u64>,
}

/// Trait común para los resolvedores de medios
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Busca canciones; una URL directa devuelve un único resultado
    async fn search(&self, query: &str) -> MusicResult<Vec<SearchHit>>;
}

/// Elige la primera canción que no sea en vivo, o la primera en general.
///
/// `fallback_duration` se usa cuando la fuente no reporta duración.
pub fn pick_playable(hits: Vec<SearchHit>, fallback_duration: u64) -> Option<Song> {
    let index = hits.iter().position(|hit| !hit.is_live).unwrap_or(0);
    let hit = hits.into_iter().nth(index)?;

    let duration = hit
        .duration_secs
        .filter(|secs| *secs > 0)
        .unwrap_or(fallback_duration);

    Some(Song::new(hit.title, hit.url, duration))
}
