use anyhow::Context as _;
use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::{MediaResolver, SearchHit};
use crate::error::{MusicError, MusicResult};

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/)",
    )
    .expect("regex de YouTube válida")
});

/// Cliente para interactuar con YouTube/yt-dlp
pub struct YouTubeClient {
    ytdlp_path: String,
    limit: usize,
    // Limitar procesos de yt-dlp concurrentes
    rate_limiter: tokio::sync::Semaphore,
}

/// Información extraída de yt-dlp (`--dump-json`, una línea por video)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
    live_status: Option<String>,
}

impl YtDlpInfo {
    fn into_hit(self) -> Option<SearchHit> {
        let url = self
            .webpage_url
            .or_else(|| self.url.filter(|u| u.starts_with("http")))
            .or_else(|| {
                self.id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })?;

        let is_live = self.is_live.unwrap_or(false)
            || matches!(self.live_status.as_deref(), Some("is_live" | "is_upcoming"));

        Some(SearchHit {
            title: self.title.unwrap_or_else(|| "Sin título".to_string()),
            url,
            is_live,
            // yt-dlp reporta segundos fraccionarios
            duration_secs: self.duration.map(|d| d.round().max(0.0) as u64),
        })
    }
}

impl YouTubeClient {
    pub fn new(ytdlp_path: impl Into<String>, limit: usize) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            limit: limit.max(1),
            rate_limiter: tokio::sync::Semaphore::new(3),
        }
    }

    /// Verifica si una URL es válida para YouTube
    pub fn is_youtube_url(url: &str) -> bool {
        YOUTUBE_URL.is_match(url)
    }

    /// Una consulta se trata como URL directa si parsea como http(s)
    pub fn is_direct_url(query: &str) -> bool {
        url::Url::parse(query)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    /// Verifica que yt-dlp esté disponible
    pub async fn verify_available(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.ytdlp_path)
            .arg("--version")
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            anyhow::bail!("yt-dlp no puede ejecutarse correctamente");
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_ytdlp(&self, args: &[&str]) -> MusicResult<String> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| MusicError::Search(e.to_string()))?;

        let output = Command::new(&self.ytdlp_path)
            .args(args)
            .output()
            .await
            .map_err(|e| MusicError::Search(format!("Error al ejecutar yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("⚠️ yt-dlp terminó con error: {}", error.trim());
            return Err(MusicError::Search(format!("yt-dlp error: {}", error.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Convierte la salida de yt-dlp en resultados; ignora líneas que no parsean
fn parse_dump_json(stdout: &str) -> Vec<SearchHit> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
            Ok(info) => info.into_hit(),
            Err(e) => {
                debug!("Línea de yt-dlp ignorada: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl MediaResolver for YouTubeClient {
    async fn search(&self, query: &str) -> MusicResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let stdout = if Self::is_direct_url(query) {
            let source = if Self::is_youtube_url(query) {
                "YouTube"
            } else {
                "URL directa"
            };
            debug!("📊 Obteniendo info de {}: {}", source, query);
            self.run_ytdlp(&["--no-playlist", "--dump-json", "--no-warnings", query])
                .await?
        } else {
            info!("🔍 Buscando en YouTube: {}", query);
            let search_query = format!("ytsearch{}:{}", self.limit, query);
            self.run_ytdlp(&[
                "--no-playlist",
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                &search_query,
            ])
            .await?
        };

        Ok(parse_dump_json(&stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YouTubeClient::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YouTubeClient::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YouTubeClient::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YouTubeClient::is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn test_direct_url_detection() {
        assert!(YouTubeClient::is_direct_url("https://youtu.be/abc"));
        assert!(YouTubeClient::is_direct_url("http://example.com/a.mp3"));
        assert!(!YouTubeClient::is_direct_url("never gonna give you up"));
        assert!(!YouTubeClient::is_direct_url("ftp://example.com/a.mp3"));
    }

    #[test]
    fn test_parse_flat_search_output() {
        let stdout = concat!(
            r#"{"id":"abc","title":"Canción A","duration":199.6,"url":"https://www.youtube.com/watch?v=abc"}"#,
            "\n",
            "not json\n",
            r#"{"id":"live1","title":"Radio 24/7","live_status":"is_live"}"#,
            "\n",
        );

        let hits = parse_dump_json(stdout);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Canción A");
        assert_eq!(hits[0].duration_secs, Some(200));
        assert!(!hits[0].is_live);
        assert_eq!(hits[1].url, "https://www.youtube.com/watch?v=live1");
        assert!(hits[1].is_live);
        assert_eq!(hits[1].duration_secs, None);
    }

    #[test]
    fn test_parse_prefers_webpage_url() {
        let stdout = r#"{"id":"x","title":"T","webpage_url":"https://www.youtube.com/watch?v=x","url":"https://rr1.googlevideo.com/stream","is_live":false}"#;
        let hits = parse_dump_json(stdout);
        assert_eq!(hits[0].url, "https://www.youtube.com/watch?v=x");
    }
}
