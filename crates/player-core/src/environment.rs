//! Environment Boundary
//!
//! The two collaborators the host environment implements: perception (read
//! the world) and capabilities (mutate it). Each capability is a plain method
//! so a missing one is a compile error in the host, not a runtime lookup miss.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::decision::Direction;
use crate::error::Result;
use crate::observation::Observation;

/// Whether the controlled agent can act this tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentVitals {
    /// The controlled entity no longer exists
    Absent,
    Alive,
    Dead,
}

impl AgentVitals {
    pub const fn can_act(self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Result of one perception pass
#[derive(Clone, Debug, Default)]
pub struct Capture {
    pub observation: Observation,

    /// PNG-encoded viewpoint, when the host can render one
    pub image: Option<Vec<u8>>,
}

impl Capture {
    pub const fn new(observation: Observation) -> Self {
        Self {
            observation,
            image: None,
        }
    }

    pub fn with_image(mut self, png: Vec<u8>) -> Self {
        self.image = Some(png);
        self
    }
}

/// Read side of the host environment
#[async_trait]
pub trait Perception: Send + Sync {
    /// Cheap, synchronous liveness check
    fn vitals(&self) -> AgentVitals;

    /// Capture the current viewpoint and game state
    async fn capture(&self) -> Result<Capture>;
}

/// Write side of the host environment.
///
/// Calls are fire-and-forget from the loop's point of view; an `Err` is
/// logged and the next action still runs.
pub trait Capabilities: Send + Sync {
    fn move_toward(&self, direction: Direction) -> Result<()>;

    /// Rotate the body around the vertical axis, in degrees
    fn rotate_yaw(&self, degrees: f32) -> Result<()>;

    /// Tilt the head, in degrees
    fn rotate_pitch(&self, degrees: f32) -> Result<()>;

    /// Number of inventory slots; bounds `select_slot`
    fn slot_count(&self) -> usize;

    fn select_slot(&self, index: usize) -> Result<()>;

    fn interact(&self) -> Result<()>;

    /// Use the selected tool or material on whatever is being faced
    fn construct(&self) -> Result<()>;

    fn jump(&self) -> Result<()>;
}
