//! Shared stubs for the loop and fleet tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use player_core::{
    AgentError, AgentLoop, AgentVitals, Capabilities, Capture, Direction, InventorySlot,
    LoopConfig, NearbyObject, Observation, Perception, ReasoningBackend, ReasoningRequest, Result,
    Vec3,
};

pub const REPLY: &str = "Reasoning: I need to move closer to the storage bin.\n\
    Actions:\n\
    - NAME: MOVE, direction: FORWARD\n\
    - NAME: LOOK, yaw: 10, pitch: 0\n";

// ============================================================================
// Backend
// ============================================================================

pub struct StubBackend {
    reply: Result<String>,
    pub healthy: AtomicBool,
    pub complete_delay: Duration,
    pub invalid: bool,
    pub completions_started: AtomicUsize,
    pub completions_finished: AtomicUsize,
    pub probes: AtomicUsize,
    pub last_request: Mutex<Option<ReasoningRequest>>,
}

impl StubBackend {
    pub fn replying(reply: &str) -> Self {
        Self::with_result(Ok(reply.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_result(Err(AgentError::Provider(reason.to_string())))
    }

    fn with_result(reply: Result<String>) -> Self {
        Self {
            reply,
            healthy: AtomicBool::new(true),
            complete_delay: Duration::ZERO,
            invalid: false,
            completions_started: AtomicUsize::new(0),
            completions_finished: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.complete_delay = delay;
        self
    }

    pub fn started(&self) -> usize {
        self.completions_started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.completions_finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn validate_config(&self) -> Result<()> {
        if self.invalid {
            return Err(AgentError::Config("stub endpoint is not configured".into()));
        }
        Ok(())
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        self.completions_started.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        tokio::time::sleep(self.complete_delay).await;
        self.completions_finished.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(AgentError::Provider(e.to_string())),
        }
    }

    async fn probe(&self) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Move(Direction),
    Yaw(f32),
    Pitch(f32),
    Select(usize),
    Interact,
    Construct,
    Jump,
}

pub struct StubWorld {
    pub vitals: Mutex<AgentVitals>,
    pub capture_delay: Duration,
    pub captures: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl StubWorld {
    pub fn alive() -> Self {
        Self {
            vitals: Mutex::new(AgentVitals::Alive),
            capture_delay: Duration::ZERO,
            captures: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vitals(self, vitals: AgentVitals) -> Self {
        *self.vitals.lock().unwrap() = vitals;
        self
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl Perception for StubWorld {
    fn vitals(&self) -> AgentVitals {
        *self.vitals.lock().unwrap()
    }

    async fn capture(&self) -> Result<Capture> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.capture_delay).await;

        let observation = Observation {
            position: Vec3::new(1.0, 0.0, 2.0),
            facing: Vec3::new(0.0, 0.0, 1.0),
            health: 0.8,
            held_item: Some("Hammer".into()),
            inventory: vec![InventorySlot::new("Slot0", Some("Hammer".into()))],
            nearby: vec![NearbyObject::new("Storage Bin", 3.2, "Built")],
            ..Default::default()
        };
        Ok(Capture::new(observation).with_image(vec![0x89, b'P', b'N', b'G']))
    }
}

impl Capabilities for StubWorld {
    fn move_toward(&self, direction: Direction) -> Result<()> {
        self.push(Call::Move(direction))
    }

    fn rotate_yaw(&self, degrees: f32) -> Result<()> {
        self.push(Call::Yaw(degrees))
    }

    fn rotate_pitch(&self, degrees: f32) -> Result<()> {
        self.push(Call::Pitch(degrees))
    }

    fn slot_count(&self) -> usize {
        5
    }

    fn select_slot(&self, index: usize) -> Result<()> {
        self.push(Call::Select(index))
    }

    fn interact(&self) -> Result<()> {
        self.push(Call::Interact)
    }

    fn construct(&self) -> Result<()> {
        self.push(Call::Construct)
    }

    fn jump(&self) -> Result<()> {
        self.push(Call::Jump)
    }
}

pub fn agent(backend: &Arc<StubBackend>, world: &Arc<StubWorld>, config: LoopConfig) -> AgentLoop {
    AgentLoop::new(backend.clone(), world.clone(), world.clone(), config)
}
