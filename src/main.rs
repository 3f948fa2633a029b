use anyhow::{Context, Result};
use clap::Parser;
use presence_announcer::session::AlertLog;
use presence_announcer::{
    create_router, AnnouncementEngine, AppState, Config, GreetingTable, HttpStreamResource,
    SessionController, SocketChannelFactory, SpeechQueue,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Announces recognized people from a live recognition feed")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/presence-announcer")]
    config: String,

    /// Backend origin, overrides configuration and BACKEND_ORIGIN
    #[arg(long)]
    origin: Option<String>,

    /// Port for the control API
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(origin) = args.origin {
        cfg.backend.origin = origin;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }
    let origin = cfg.origin_url()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Recognition backend: {}", origin);

    let speech = Arc::new(SpeechQueue::start(cfg.announcer.speaker()?).await);
    let policy = cfg.announcer.voice_policy();
    let mut greetings = GreetingTable::default();
    greetings.set_generic(cfg.announcer.generic_greeting.clone());
    let greetings = greetings.with_entries(
        cfg.announcer
            .greetings
            .iter()
            .map(|g| (g.label.clone(), g.message.clone())),
    );

    let engine = AnnouncementEngine::new(greetings, policy, speech.clone());

    let stream = HttpStreamResource::new(
        &origin,
        Duration::from_secs(cfg.backend.request_timeout_secs),
    )?;
    let channels = SocketChannelFactory::new(
        &origin,
        &cfg.channel.path,
        Duration::from_millis(cfg.channel.stop_timeout_ms),
    )?;
    info!("Event channel endpoint: {}", channels.url());

    let controller = Arc::new(SessionController::new(
        Arc::new(stream),
        Arc::new(channels),
        engine,
        Arc::new(AlertLog::default()),
    ));
    let event_loop = controller.spawn_event_loop();

    let app = create_router(AppState::new(Arc::clone(&controller)));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received");
        })
        .await
        .context("HTTP server failed")?;

    controller.shutdown(Duration::from_secs(5)).await;
    let _ = event_loop.await;
    speech.shutdown().await;

    info!("Goodbye");
    Ok(())
}
