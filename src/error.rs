//! Errores del dominio de reproducción.
//!
//! Solo una parte de estas variantes llega al usuario como respuesta directa
//! (ver [`MusicError::is_user_visible`]). El resto se absorbe: se registra en el
//! log y la reproducción continúa.

use serenity::model::id::GuildId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    /// Falló la unión al canal de voz
    #[error("error de conexión de voz: {0}")]
    Connection(String),

    /// La búsqueda no devolvió ningún resultado
    #[error("sin resultados para '{0}'")]
    SearchEmpty(String),

    /// El resolvedor de medios falló (yt-dlp no disponible, salida inválida...)
    #[error("error de búsqueda: {0}")]
    Search(String),

    /// Error del stream de audio, se recupera saltando la canción
    #[error("error de stream: {0}")]
    Stream(String),

    /// No se pudo renderizar o editar el panel de progreso
    #[error("error actualizando el panel: {0}")]
    DisplayUpdate(String),

    /// Faltan permisos de conectar/hablar
    #[error("permisos insuficientes: {0}")]
    Permission(String),

    #[error("el usuario no está en un canal de voz")]
    NotInVoice,

    #[error("no hay sesión de reproducción activa")]
    NoSession,

    /// La sesión existe pero todavía no tiene handle de reproducción
    #[error("la sesión todavía no está reproduciendo")]
    NotPlaying,

    #[error("no hay canción anterior")]
    NoPrevious,

    #[error("se necesitan al menos 2 canciones en cola para mezclar (hay {0})")]
    NotEnoughToShuffle(usize),

    #[error("la cola está llena (máximo {0} canciones)")]
    QueueFull(usize),

    #[error("los controles de este panel expiraron")]
    ControlsExpired,

    #[error("ya existe una sesión para la guild {0}")]
    SessionExists(GuildId),
}

pub type MusicResult<T> = std::result::Result<T, MusicError>;

impl MusicError {
    /// Indica si el error se responde al usuario o solo se registra.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            MusicError::Stream(_) | MusicError::DisplayUpdate(_) | MusicError::SessionExists(_)
        )
    }

    /// Texto de respuesta para el canal.
    pub fn user_message(&self) -> String {
        match self {
            MusicError::Connection(_) => "❌ Error al unirme al canal de voz.".to_string(),
            MusicError::SearchEmpty(_) => "❌ No encontré resultados.".to_string(),
            MusicError::Search(_) => "❌ La búsqueda falló, inténtalo de nuevo.".to_string(),
            MusicError::Permission(_) => {
                "❌ No tengo permisos para unirme o hablar en ese canal.".to_string()
            }
            MusicError::NotInVoice => "🎧 Únete a un canal de voz primero.".to_string(),
            MusicError::NoSession => "❌ No hay música en reproducción.".to_string(),
            MusicError::NotPlaying => "⏳ La canción todavía se está cargando.".to_string(),
            MusicError::NoPrevious => "❌ No hay una canción anterior.".to_string(),
            MusicError::NotEnoughToShuffle(_) => {
                "❌ Se necesitan al menos 2 canciones en cola para mezclar.".to_string()
            }
            MusicError::QueueFull(max) => {
                format!("❌ La cola está llena (máximo {} canciones).", max)
            }
            MusicError::ControlsExpired => {
                "⌛ Estos controles expiraron, usa los comandos de texto.".to_string()
            }
            _ => "❌ Ocurrió un error inesperado.".to_string(),
        }
    }
}
