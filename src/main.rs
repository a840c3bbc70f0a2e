use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pqvault::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully ({:?} backend)", config.backend);

    let state = AppState::new(&config).await?;
    let app = routes::router(state.clone())?;

    let gc_state = state.clone();
    let gc_interval = Duration::from_secs(config.share_gc_interval_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(gc_interval).await;
            tracing::info!("🧹 Running scheduled purge of expired shared links...");
            match gc_state.envelopes.purge_expired_shares(Utc::now()).await {
                Ok(purged) => {
                    tracing::info!("✅ Purge completed, {} links removed", purged);
                }
                Err(e) => {
                    tracing::error!("❌ Purge failed: {}", e);
                }
            }
        }
    });

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!(
        "✅ Background purge job started (runs every {}s)",
        config.share_gc_interval_secs
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
