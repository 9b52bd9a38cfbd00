//! Simulated World
//!
//! Headless stand-in for the game: one controlled body, an inventory and a
//! handful of constructible objects. Implements both sides of the environment
//! boundary so agents can run without a game client attached.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use player_core::{
    AgentError, AgentLoop, AgentVitals, Capabilities, Capture, Direction, HealthUnit,
    InventorySlot, LoopConfig, NearbyObject, Observation, Perception, ReasoningBackend, Result,
    Vec3,
};

/// Distance covered by one MOVE
const STEP: f32 = 1.0;

/// How far INTERACT and CONSTRUCT reach
const REACH: f32 = 2.5;

/// Objects beyond this are not reported
const VIEW_DISTANCE: f32 = 30.0;

/// Construction progress of a placed object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    Frame,
    Partial,
    Built,
}

impl BuildState {
    const fn advance(self) -> Self {
        match self {
            Self::Frame => Self::Partial,
            Self::Partial | Self::Built => Self::Built,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Frame => "Frame",
            Self::Partial => "Partial",
            Self::Built => "Built",
        }
    }
}

#[derive(Clone, Debug)]
struct WorldObject {
    name: String,
    position: Vec3,
    state: BuildState,
}

#[derive(Debug)]
struct WorldState {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    health: f32,
    alive: bool,
    slots: Vec<Option<String>>,
    active_slot: usize,
    objects: Vec<WorldObject>,
}

impl WorldState {
    fn facing(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.sin() * pitch.cos(), -pitch.sin(), yaw.cos() * pitch.cos())
    }

    /// Index of the nearest object within reach
    fn within_reach(&self) -> Option<usize> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (i, o.position.distance(&self.position)))
            .filter(|(_, d)| *d <= REACH)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

/// Simulated world for one agent
#[derive(Debug)]
pub struct SimulatedWorld {
    state: Mutex<WorldState>,
    resolution: u32,
}

impl SimulatedWorld {
    /// Default scene: a few objects around the origin and a starter inventory
    pub fn new(resolution: u32) -> Self {
        let object = |name: &str, x, z, state| WorldObject {
            name: name.to_string(),
            position: Vec3::new(x, 0.0, z),
            state,
        };

        Self {
            state: Mutex::new(WorldState {
                position: Vec3::default(),
                yaw: 0.0,
                pitch: 0.0,
                health: 100.0,
                alive: true,
                slots: vec![Some("Hammer".into()), Some("Planks".into()), None, None, None],
                active_slot: 0,
                objects: vec![
                    object("Wall Frame", 0.0, 2.0, BuildState::Frame),
                    object("Storage Bin", 3.0, 4.0, BuildState::Built),
                    object("Workbench", -5.0, 1.0, BuildState::Partial),
                ],
            }),
            resolution,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorldState>> {
        self.state
            .lock()
            .map_err(|_| AgentError::Capability("world state lock poisoned".into()))
    }

    fn alive(&self) -> Result<MutexGuard<'_, WorldState>> {
        let state = self.lock()?;
        if !state.alive {
            return Err(AgentError::Capability("agent is dead".into()));
        }
        Ok(state)
    }
}

impl Default for SimulatedWorld {
    fn default() -> Self {
        Self::new(512)
    }
}

/// Agent loop driving a fresh simulated world
pub fn simulated_agent(
    backend: Arc<dyn ReasoningBackend>,
    config: LoopConfig,
    resolution: u32,
) -> Result<AgentLoop> {
    let world = Arc::new(SimulatedWorld::new(resolution));
    AgentLoop::builder()
        .backend(backend)
        .perception(world.clone())
        .capabilities(world)
        .config(config)
        .build()
}

#[async_trait]
impl Perception for SimulatedWorld {
    fn vitals(&self) -> AgentVitals {
        match self.state.lock() {
            Ok(state) if state.alive => AgentVitals::Alive,
            Ok(_) => AgentVitals::Dead,
            Err(_) => AgentVitals::Absent,
        }
    }

    async fn capture(&self) -> Result<Capture> {
        let state = self
            .state
            .lock()
            .map_err(|_| AgentError::Perception("world state lock poisoned".into()))?;

        let held_item = state.slots.get(state.active_slot).cloned().flatten();
        let inventory = state
            .slots
            .iter()
            .enumerate()
            .map(|(i, item)| InventorySlot::new(format!("Slot{i}"), item.clone()))
            .collect();
        let nearby = state
            .objects
            .iter()
            .map(|o| {
                let distance = o.position.distance(&state.position);
                NearbyObject::new(&o.name, distance, o.state.as_str())
            })
            .filter(|o| o.distance <= VIEW_DISTANCE)
            .collect();

        let mut observation = Observation {
            position: state.position,
            rotation: Vec3::new(state.pitch, state.yaw, 0.0),
            facing: state.facing(),
            health: state.health,
            health_unit: HealthUnit::Percent,
            held_item,
            inventory,
            nearby,
        };
        observation.truncate_nearby(player_core::prompt::NEARBY_OBJECT_LIMIT);

        // Headless: nothing to render at this resolution.
        tracing::trace!(resolution = self.resolution, "captured simulated state");
        Ok(Capture::new(observation))
    }
}

impl Capabilities for SimulatedWorld {
    fn move_toward(&self, direction: Direction) -> Result<()> {
        let mut state = self.alive()?;
        let yaw = state.yaw.to_radians();
        let (forward, right) = (
            Vec3::new(yaw.sin(), 0.0, yaw.cos()),
            Vec3::new(yaw.cos(), 0.0, -yaw.sin()),
        );
        let (axis, sign) = match direction {
            Direction::Forward => (forward, 1.0),
            Direction::Backward => (forward, -1.0),
            Direction::Right => (right, 1.0),
            Direction::Left => (right, -1.0),
        };

        state.position.x += axis.x * STEP * sign;
        state.position.z += axis.z * STEP * sign;
        tracing::debug!(%direction, position = %state.position, "moved");
        Ok(())
    }

    fn rotate_yaw(&self, degrees: f32) -> Result<()> {
        let mut state = self.alive()?;
        state.yaw = (state.yaw + degrees).rem_euclid(360.0);
        Ok(())
    }

    fn rotate_pitch(&self, degrees: f32) -> Result<()> {
        let mut state = self.alive()?;
        state.pitch = (state.pitch + degrees).clamp(-90.0, 90.0);
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.lock().map_or(0, |s| s.slots.len())
    }

    fn select_slot(&self, index: usize) -> Result<()> {
        let mut state = self.alive()?;
        if index >= state.slots.len() {
            return Err(AgentError::Capability(format!("no inventory slot {index}")));
        }
        state.active_slot = index;
        Ok(())
    }

    fn interact(&self) -> Result<()> {
        let state = self.alive()?;
        let target = state
            .within_reach()
            .ok_or_else(|| AgentError::Capability("nothing within reach".into()))?;
        tracing::debug!(object = %state.objects[target].name, "interacted");
        Ok(())
    }

    fn construct(&self) -> Result<()> {
        let mut state = self.alive()?;
        let target = state
            .within_reach()
            .ok_or_else(|| AgentError::Capability("nothing within reach to build".into()))?;

        let object = &mut state.objects[target];
        if object.state == BuildState::Built {
            return Err(AgentError::Capability(format!("{} is already built", object.name)));
        }
        object.state = object.state.advance();
        tracing::debug!(
            object = %object.name,
            state = object.state.as_str(),
            "construction advanced"
        );
        Ok(())
    }

    fn jump(&self) -> Result<()> {
        self.alive()?;
        Ok(())
    }
}
