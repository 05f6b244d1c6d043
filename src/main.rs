use anyhow::Context;
use factscreen::api::{build_router, AppState};
use factscreen::config::Config;
use factscreen::logging::init_tracing;
use factscreen::pipeline::VerdictResolver;
use factscreen::providers::ProviderHub;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let providers = ProviderHub::from_config(&config.providers)?;
    let resolver = VerdictResolver::from_config(&config)?;

    info!(
        providers = ?providers.configured_sources(),
        embedding_model = %config.similarity.embedding_model,
        ai_model = %config.ai.model,
        ai_enabled = config.ai.enabled,
        threshold = resolver.default_threshold(),
        "FactScreen starting"
    );

    let app = build_router(AppState::new(providers, resolver), config.server.max_body_bytes);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
