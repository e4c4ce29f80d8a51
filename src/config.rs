use anyhow::Result;
use std::{str::FromStr, time::Duration};

/// Variante de presentación del reproductor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    /// Un mensaje de texto por canción, comandos `!pause`/`!resume` separados
    Plain,
    /// Panel con barra de progreso y botones
    Enhanced,
}

impl FromStr for PanelMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "simple" => Ok(PanelMode::Plain),
            "enhanced" | "panel" => Ok(PanelMode::Enhanced),
            other => anyhow::bail!("PANEL_MODE inválido: '{}' (usa plain o enhanced)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Presentación
    pub panel_mode: PanelMode,
    pub progress_tick: Duration,
    pub controls_ttl: Duration,

    // Cola
    pub default_song_duration: u64, // En segundos
    pub max_queue_size: usize,

    // Búsqueda
    pub ytdlp_path: String,
    pub search_results: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,
            command_prefix: std::env::var("COMMAND_PREFIX")
                .unwrap_or_else(|_| defaults.command_prefix.clone()),

            panel_mode: std::env::var("PANEL_MODE")
                .unwrap_or_else(|_| "enhanced".to_string())
                .parse()?,
            progress_tick: humantime::parse_duration(
                &std::env::var("PROGRESS_TICK").unwrap_or_else(|_| "10s".to_string()),
            )?,
            controls_ttl: humantime::parse_duration(
                &std::env::var("CONTROLS_TTL").unwrap_or_else(|_| "300s".to_string()),
            )?,

            default_song_duration: std::env::var("DEFAULT_SONG_DURATION")
                .unwrap_or_else(|_| "180".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,

            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| defaults.ytdlp_path.clone()),
            search_results: std::env::var("SEARCH_RESULTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Progress tick and controls lifetime must be non-zero
    /// - Fallback song duration must be positive
    /// - Queue size and search result count must be > 0
    /// - Command prefix must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.progress_tick.is_zero() {
            anyhow::bail!("PROGRESS_TICK must be greater than 0");
        }

        if self.controls_ttl.is_zero() {
            anyhow::bail!("CONTROLS_TTL must be greater than 0");
        }

        if self.default_song_duration == 0 {
            anyhow::bail!("DEFAULT_SONG_DURATION must be greater than 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.search_results == 0 {
            anyhow::bail!("SEARCH_RESULTS must be greater than 0");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("COMMAND_PREFIX cannot be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix '{}'\n  \
            Panel: {:?}, tick {}, controls {}\n  \
            Queue: {} max, {}s fallback duration\n  \
            Search: {} ({} results)",
            self.command_prefix,
            self.panel_mode,
            humantime::format_duration(self.progress_tick),
            humantime::format_duration(self.controls_ttl),
            self.max_queue_size,
            self.default_song_duration,
            self.ytdlp_path,
            self.search_results,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            command_prefix: "!".to_string(),

            panel_mode: PanelMode::Enhanced,
            progress_tick: Duration::from_secs(10),
            controls_ttl: Duration::from_secs(300),

            default_song_duration: 180,
            max_queue_size: 1000,

            ytdlp_path: "yt-dlp".to_string(),
            search_results: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let config = Config {
            progress_tick: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_queue_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            command_prefix: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_panel_mode_parsing() {
        assert_eq!("plain".parse::<PanelMode>().unwrap(), PanelMode::Plain);
        assert_eq!("Enhanced".parse::<PanelMode>().unwrap(), PanelMode::Enhanced);
        assert!("fancy".parse::<PanelMode>().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..Config::default()
        };
        assert!(!config.summary().contains("super-secret"));
    }
}
