use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::driver::{DriverSettings, PlaybackDriver};
use crate::audio::songbird_transport::SongbirdTransport;
use crate::bot::{surface::SerenityPanel, MusicBot};
use crate::config::Config;
use crate::sources::YouTubeClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Music v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let resolver = Arc::new(YouTubeClient::new(
        config.ytdlp_path.clone(),
        config.search_results,
    ));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&resolver).await;
    }

    // Señales de fin/error de los tracks hacia el driver
    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();

    let manager = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(manager.clone(), events_tx));
    let surface = Arc::new(SerenityPanel::new(Arc::new(Http::new(&config.discord_token))));

    let driver = PlaybackDriver::new(
        resolver,
        transport,
        surface,
        DriverSettings::from_config(&config),
    );
    tokio::spawn(driver.clone().run_events(events_rx));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let handler = MusicBot::new(config, driver);

    // Construir cliente
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Señal de shutdown recibida, cerrando...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Error al registrar Ctrl+C: {:?}", e),
        }
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(resolver: &YouTubeClient) -> Result<()> {
    let version = resolver.verify_available().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
