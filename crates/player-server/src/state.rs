//! Application State

use std::sync::Arc;

use player_core::{AgentFleet, LoopConfig, ReasoningBackend};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Running agents
    pub fleet: Arc<AgentFleet>,

    /// Backend shared by every agent; probed by `/health`
    pub backend: Arc<dyn ReasoningBackend>,

    /// Loop settings for agents spawned at runtime
    pub loop_config: LoopConfig,

    /// Capture resolution of spawned simulated worlds
    pub perception_resolution: u32,
}
