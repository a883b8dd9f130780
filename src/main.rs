use anyhow::{Context, Result};
use clap::Parser;
use interview_agent::{create_router, AppState, Config, HttpFeedbackClient, NatsConnector};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interview-agent", version, about = "Voice interview call session service")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/interview-agent")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).context("Failed to load configuration")?;

    info!("Interview Agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let missing = cfg.validate();
    if missing > 0 {
        warn!("{} voice settings missing; affected calls will not connect", missing);
    }

    let connector = NatsConnector::open(&cfg.nats.url, &cfg.voice.web_token)
        .await
        .context("Failed to connect to voice gateway")?;

    let feedback = HttpFeedbackClient::new(cfg.feedback.endpoint.clone(), cfg.feedback.timeout())?;
    info!("Feedback service: {}", feedback.endpoint());

    let state = AppState::new(Arc::new(connector), Arc::new(feedback), cfg.call_targets());
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
