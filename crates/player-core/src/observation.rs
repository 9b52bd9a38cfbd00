//! Observation Model
//!
//! Snapshot of the controlled agent's state at tick time. Produced fresh by the
//! perception collaborator each tick and dropped once the prompt is built.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker rendered for an inventory slot with no occupant
pub const EMPTY_SLOT: &str = "Empty";

/// World-space vector (position, facing, euler rotation)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Scale the perception layer reported health in.
///
/// Hosts that know their scale should say so; `Unspecified` falls back to the
/// heuristic that anything at or below 1.0 is a 0–1 fraction, which makes a
/// percent-scale reading of exactly 1.0 indistinguishable from full health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthUnit {
    /// 0.0–1.0
    Fraction,
    /// 0–100
    Percent,
    #[default]
    Unspecified,
}

/// One inventory slot descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    /// Host-specific slot key (e.g. "LeftHand", "Back")
    pub key: String,

    /// Display name of whatever occupies the slot
    pub occupant: Option<String>,
}

impl InventorySlot {
    pub fn new(key: impl Into<String>, occupant: Option<String>) -> Self {
        Self {
            key: key.into(),
            occupant,
        }
    }

    pub fn empty(key: impl Into<String>) -> Self {
        Self::new(key, None)
    }

    pub fn occupant_or_empty(&self) -> &str {
        self.occupant.as_deref().unwrap_or(EMPTY_SLOT)
    }
}

/// Something close enough to the agent to be worth mentioning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyObject {
    pub name: String,

    /// Distance from the agent in world units
    pub distance: f32,

    /// Construction state as reported by the host (e.g. "Built", "Frame")
    pub build_state: String,
}

impl NearbyObject {
    pub fn new(name: impl Into<String>, distance: f32, build_state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distance,
            build_state: build_state.into(),
        }
    }
}

/// Immutable per-tick snapshot of the controlled agent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: Vec3,

    /// Euler rotation in degrees
    pub rotation: Vec3,

    /// Unit forward vector
    pub facing: Vec3,

    /// Raw health value; interpret through `health_unit`
    pub health: f32,

    #[serde(default)]
    pub health_unit: HealthUnit,

    pub held_item: Option<String>,

    /// Ordered inventory slots
    #[serde(default)]
    pub inventory: Vec<InventorySlot>,

    /// Nearby objects, nearest first
    #[serde(default)]
    pub nearby: Vec<NearbyObject>,
}

impl Observation {
    /// Health on a 0–100 scale
    pub fn health_percent(&self) -> f32 {
        match self.health_unit {
            HealthUnit::Fraction => self.health * 100.0,
            HealthUnit::Percent => self.health,
            HealthUnit::Unspecified if self.health <= 1.0 => self.health * 100.0,
            HealthUnit::Unspecified => self.health,
        }
    }

    /// Sort nearby objects nearest first and keep at most `limit`
    pub fn truncate_nearby(&mut self, limit: usize) {
        self.nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.nearby.truncate(limit);
    }
}
