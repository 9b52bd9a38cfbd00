//! llm-player Server
//!
//! Runs a fleet of LLM-driven agents over simulated worlds and exposes an
//! HTTP control surface for status and toggling.

mod handlers;
mod state;
mod world;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use player_core::AgentFleet;
use player_runtime::{Settings, create_backend};

use crate::handlers::{health_check, list_agents, set_agent_active, spawn_agent, toggle_agents};
use crate::state::AppState;
use crate::world::simulated_agent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(
        provider = ?settings.provider,
        agents = settings.agent_count,
        "settings loaded"
    );

    let backend = create_backend(settings.provider.clone())?;

    let loops = (0..settings.agent_count)
        .map(|_| {
            let config = settings.loop_config.clone();
            simulated_agent(backend.clone(), config, settings.perception_resolution)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let fleet = Arc::new(AgentFleet::launch(loops));

    let state = AppState {
        fleet: fleet.clone(),
        backend,
        loop_config: settings.loop_config.clone(),
        perception_resolution: settings.perception_resolution,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/agents", get(list_agents).post(spawn_agent))
        .route("/api/agents/toggle", post(toggle_agents))
        .route("/api/agents/{id}/active", post(set_agent_active))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("llm-player control server on http://{}", settings.bind_addr);
    tracing::info!("  GET  /health                 - Backend health");
    tracing::info!("  GET  /api/agents             - Agent status");
    tracing::info!("  POST /api/agents             - Spawn an agent");
    tracing::info!("  POST /api/agents/toggle      - Toggle all agents");
    tracing::info!("  POST /api/agents/{{id}}/active - Enable/disable one agent");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let failures = fleet.shutdown().await;
    if failures > 0 {
        tracing::warn!(failures, "some agents ended with errors");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
