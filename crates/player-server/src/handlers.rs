//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use player_core::{
    AgentError, AgentHandle, AgentId, CancellationToken, LoopStatus, ReasoningBackend,
};

use crate::state::AppState;
use crate::world::simulated_agent;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: String,
    pub backend_connected: bool,
    pub agents: usize,
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    #[serde(flatten)]
    pub status: LoopStatus,
}

impl From<&AgentHandle> for AgentView {
    fn from(handle: &AgentHandle) -> Self {
        Self {
            id: handle.id(),
            status: handle.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub active: bool,
    pub agents: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint; checks the shared backend
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_connected = state.backend.check_health(&CancellationToken::new()).await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend.name().to_string(),
        backend_connected,
        agents: state.fleet.len(),
    })
}

/// Status of every agent
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentView>> {
    Json(state.fleet.handles().iter().map(AgentView::from).collect())
}

/// Global toggle
pub async fn toggle_agents(State(state): State<AppState>) -> Json<ToggleResponse> {
    let active = state.fleet.toggle_all();
    tracing::info!(active, "agents toggled");

    Json(ToggleResponse {
        active,
        agents: state.fleet.len(),
    })
}

/// Enable or disable one agent
pub async fn set_agent_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<AgentView>, ApiError> {
    let id: AgentId = id.parse().map_err(|e: AgentError| {
        api_error(StatusCode::BAD_REQUEST, "INVALID_ID", e.to_string())
    })?;

    let handle = state.fleet.get(id).ok_or_else(|| {
        api_error(StatusCode::NOT_FOUND, "UNKNOWN_AGENT", format!("no agent {id}"))
    })?;

    handle.set_active(payload.active);
    tracing::info!(agent = %id, active = payload.active, "agent active flag set");
    Ok(Json(AgentView::from(&handle)))
}

/// Spawn one more agent over a fresh simulated world
pub async fn spawn_agent(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AgentView>), ApiError> {
    let agent = simulated_agent(
        state.backend.clone(),
        state.loop_config.clone(),
        state.perception_resolution,
    )
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "SPAWN_FAILED", e.to_string()))?;

    let handle = agent.handle();
    let id = state.fleet.spawn(agent);
    tracing::info!(agent = %id, agents = state.fleet.len(), "agent spawned");
    Ok((StatusCode::CREATED, Json(AgentView::from(&handle))))
}
