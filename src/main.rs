use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arena_server::config::ServerConfig;
use arena_server::game::geometry::Geometry;
use arena_server::metrics::Metrics;
use arena_server::net::game_session::{start_session_actor, GameSession};
use arena_server::net::scheduler::TokioScheduler;
use arena_server::net::transport::WebTransportServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, max_connections={}",
        config.bind_address, config.port, config.max_connections
    );

    let metrics = Arc::new(Metrics::new());

    #[cfg(feature = "metrics")]
    {
        let metrics_clone = metrics.clone();
        let metrics_port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) =
                arena_server::metrics::start_metrics_server(metrics_clone, metrics_port).await
            {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let rng = match config.rng_seed {
        Some(seed) => {
            info!("Using fixed RNG seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    // Session actor owns all game state; timers and connections feed its channel
    let (events_tx, events_rx) = unbounded_channel();
    let session = GameSession::new(
        Geometry::arena(),
        rng,
        Box::new(TokioScheduler::new(events_tx.clone())),
        metrics.clone(),
    );
    let actor = start_session_actor(session, events_rx);

    let server = WebTransportServer::new(config.clone(), events_tx, metrics.clone()).await?;

    info!("Server ready on https://{}", server.bind_addr());
    info!("Certificate hash: {}", server.cert_hash());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    actor.abort();
    info!("Server stopped");

    Ok(())
}
