//! Agent Decision Loop
//!
//! The observe → reason → parse → dispatch cycle for one controlled agent.
//!
//! ```text
//! Uninitialized ──► HealthChecking ──► Ticking ◄──► Paused
//!       │                 │               │           │
//!       └─────────────────┴───────────────┴───────────┴──► Stopped
//! ```
//!
//! Ticks never overlap: the next interval wait starts only once the previous
//! tick finished, timed out or was skipped. Every wait is bounded, and stopping
//! (or pausing) the loop drops any in-flight backend call so its reply is never
//! dispatched.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dispatcher::{ActionDispatcher, DispatchSummary};
use crate::environment::{Capabilities, Perception};
use crate::error::{AgentError, Result};
use crate::parser::ResponseParser;
use crate::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::provider::{ReasoningBackend, ReasoningRequest, is_error_reply};

/// Slowest allowed cadence (one decision every 100 s)
pub const MIN_TICK_RATE: f32 = 0.01;

/// Fastest allowed cadence
pub const MAX_TICK_RATE: f32 = 20.0;

// ============================================================================
// Identity & configuration
// ============================================================================

/// Unique agent identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| AgentError::Config(format!("invalid agent id '{s}': {e}")))
    }
}

/// Loop configuration
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Decisions per second, clamped to `MIN_TICK_RATE..=MAX_TICK_RATE`
    pub tick_rate: f32,

    /// Bound on one perception capture
    pub capture_timeout: Duration,

    /// Bound on one backend completion
    pub response_timeout: Duration,

    /// System prompt sent with every request
    pub system_prompt: String,

    /// Log the model's reasoning at info level instead of debug
    pub log_reasoning: bool,

    /// Whether the agent starts enabled
    pub start_active: bool,

    /// Re-run the health probe when resuming from pause
    pub reprobe_on_resume: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_rate: 1.0,
            capture_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(30),
            system_prompt: SYSTEM_PROMPT.into(),
            log_reasoning: true,
            start_active: true,
            reprobe_on_resume: false,
        }
    }
}

impl LoopConfig {
    /// Wait between ticks
    pub fn tick_period(&self) -> Duration {
        let rate = if self.tick_rate.is_nan() {
            MIN_TICK_RATE
        } else {
            self.tick_rate.clamp(MIN_TICK_RATE, MAX_TICK_RATE)
        };
        Duration::from_secs_f32(1.0 / rate)
    }
}

// ============================================================================
// State
// ============================================================================

/// Lifecycle phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    #[default]
    Uninitialized,
    HealthChecking,
    Ticking,
    Paused,
    Stopped,
}

/// Snapshot of one loop, published after every transition and tick
#[derive(Clone, Debug, Default, Serialize)]
pub struct LoopStatus {
    pub phase: LoopPhase,

    /// Control flag as of the snapshot
    pub active: bool,

    /// Last health probe result; `None` before the first probe
    pub healthy: Option<bool>,

    pub ticks_completed: u64,
    pub ticks_skipped: u64,
    pub ticks_idle: u64,

    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_reasoning: Option<String>,

    /// Why the loop stopped, if it stopped on a failure
    pub stop_reason: Option<String>,
}

/// Pipeline stage a tick was skipped in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStage {
    Perception,
    Reasoning,
    Parsing,
}

impl TickStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Perception => "perception",
            Self::Reasoning => "reasoning",
            Self::Parsing => "parsing",
        }
    }
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one tick ended
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Controlled agent absent or dead; nothing attempted
    Idle,
    /// A recoverable failure; the next tick is the retry
    Skipped { stage: TickStage, reason: String },
    /// Decision dispatched
    Dispatched {
        reasoning: String,
        summary: DispatchSummary,
    },
    /// Stop or pause arrived mid-tick; partial results discarded
    Cancelled,
}

impl TickOutcome {
    fn skipped(stage: TickStage, reason: impl Into<String>) -> Self {
        Self::Skipped {
            stage,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Control and status access to a running (or finished) loop
#[derive(Clone)]
pub struct AgentHandle {
    id: AgentId,
    active: Arc<watch::Sender<bool>>,
    status: watch::Receiver<LoopStatus>,
    shutdown: CancellationToken,
}

impl AgentHandle {
    pub const fn id(&self) -> AgentId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Enable or disable ticking; returns `false` if nothing changed
    pub fn set_active(&self, active: bool) -> bool {
        self.active.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        })
    }

    /// Flip the active flag; returns the new value
    pub fn toggle(&self) -> bool {
        let mut now = false;
        self.active.send_modify(|current| {
            *current = !*current;
            now = *current;
        });
        now
    }

    /// Stop the loop for good, cancelling any in-flight backend call
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn status(&self) -> LoopStatus {
        let mut status = self.status.borrow().clone();
        status.active = self.is_active();
        status
    }

    /// Wait until the loop reaches `phase`
    pub async fn wait_for_phase(&self, phase: LoopPhase) {
        let mut rx = self.status.clone();
        // The loop owns the sender for its whole life; an error means it is gone.
        let _ = rx.wait_for(|s| s.phase == phase).await;
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("phase", &self.status.borrow().phase)
            .finish()
    }
}

// ============================================================================
// Loop
// ============================================================================

/// One agent's decision loop
pub struct AgentLoop {
    id: AgentId,
    backend: Arc<dyn ReasoningBackend>,
    perception: Arc<dyn Perception>,
    dispatcher: ActionDispatcher,
    config: LoopConfig,
    active: Arc<watch::Sender<bool>>,
    status: watch::Sender<LoopStatus>,
    shutdown: CancellationToken,
    config_error: Option<String>,
}

impl AgentLoop {
    /// Create a loop; backend configuration is validated here
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        perception: Arc<dyn Perception>,
        capabilities: Arc<dyn Capabilities>,
        config: LoopConfig,
    ) -> Self {
        let config_error = backend.validate_config().err().map(|e| e.to_string());
        let (active, _) = watch::channel(config.start_active);
        let (status, _) = watch::channel(LoopStatus::default());

        Self {
            id: AgentId::new(),
            backend,
            perception,
            dispatcher: ActionDispatcher::new(capabilities),
            config,
            active: Arc::new(active),
            status,
            shutdown: CancellationToken::new(),
            config_error,
        }
    }

    pub fn builder() -> AgentLoopBuilder {
        AgentLoopBuilder::new()
    }

    pub const fn id(&self) -> AgentId {
        self.id
    }

    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            id: self.id,
            active: Arc::clone(&self.active),
            status: self.status.subscribe(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Run until stopped.
    ///
    /// Returns `Err` only for startup failures (invalid configuration or a
    /// failed health probe); in that case no tick ever runs.
    pub async fn run(self) -> Result<()> {
        if let Some(reason) = self.config_error.clone() {
            tracing::error!(
                agent = %self.id,
                backend = self.backend.name(),
                %reason,
                "invalid backend configuration; agent stopped"
            );
            self.stop_with(Some(reason.clone()));
            return Err(AgentError::Config(reason));
        }

        self.set_phase(LoopPhase::HealthChecking);
        let healthy = self.probe_health().await;
        if self.shutdown.is_cancelled() {
            self.stop_with(None);
            return Ok(());
        }
        if !healthy {
            let reason = format!("{} health check failed", self.backend.name());
            tracing::error!(
                agent = %self.id,
                backend = self.backend.name(),
                "backend health check failed; agent stopped"
            );
            self.stop_with(Some(reason.clone()));
            return Err(AgentError::ProviderUnavailable(reason));
        }

        tracing::info!(agent = %self.id, backend = self.backend.name(), "agent loop started");
        let period = self.config.tick_period();
        let mut active_rx = self.active.subscribe();
        let mut resumed = false;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if !*active_rx.borrow_and_update() {
                self.set_phase(LoopPhase::Paused);
                tracing::info!(agent = %self.id, "agent paused");
                tokio::select! {
                    () = self.shutdown.cancelled() => break,
                    () = wait_for_flag(&mut active_rx, true) => {}
                }
                resumed = true;
                continue;
            }

            if resumed {
                resumed = false;
                if self.config.reprobe_on_resume && !self.probe_health().await {
                    tracing::warn!(
                        agent = %self.id,
                        "health re-probe failed on resume; staying paused"
                    );
                    self.active.send_replace(false);
                    continue;
                }
                tracing::info!(agent = %self.id, "agent resumed");
            }

            self.set_phase(LoopPhase::Ticking);
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = wait_for_flag(&mut active_rx, false) => continue,
                () = tokio::time::sleep(period) => {}
            }

            let tick_cancel = self.shutdown.child_token();
            let outcome = tokio::select! {
                outcome = self.tick(&tick_cancel) => outcome,
                () = wait_for_flag(&mut active_rx, false) => {
                    tick_cancel.cancel();
                    TickOutcome::Cancelled
                }
                () = self.shutdown.cancelled() => TickOutcome::Cancelled,
            };
            self.record(&outcome);
        }

        self.stop_with(None);
        tracing::info!(agent = %self.id, "agent loop stopped");
        Ok(())
    }

    /// One pass of the pipeline.
    ///
    /// Public so hosts with their own scheduler can drive ticks directly.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let vitals = self.perception.vitals();
        if !vitals.can_act() {
            tracing::trace!(agent = %self.id, ?vitals, "agent cannot act; idling");
            return TickOutcome::Idle;
        }

        let capture_timeout = self.config.capture_timeout;
        let capture = match tokio::time::timeout(capture_timeout, self.perception.capture()).await
        {
            Ok(Ok(capture)) => capture,
            Ok(Err(e)) => return TickOutcome::skipped(TickStage::Perception, e.to_string()),
            Err(_) => {
                let err = AgentError::Timeout {
                    stage: TickStage::Perception.as_str(),
                    after: capture_timeout,
                };
                return TickOutcome::skipped(TickStage::Perception, err.to_string());
            }
        };

        let request = ReasoningRequest {
            image: capture.image,
            system_prompt: self.config.system_prompt.clone(),
            user_prompt: build_prompt(&capture.observation),
        };

        let response_timeout = self.config.response_timeout;
        let reply = match tokio::time::timeout(
            response_timeout,
            self.backend.get_response(&request, cancel),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(AgentError::Cancelled)) => return TickOutcome::Cancelled,
            Ok(Err(e)) => return TickOutcome::skipped(TickStage::Reasoning, e.to_string()),
            Err(_) => {
                let err = AgentError::Timeout {
                    stage: TickStage::Reasoning.as_str(),
                    after: response_timeout,
                };
                return TickOutcome::skipped(TickStage::Reasoning, err.to_string());
            }
        };

        if cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }
        if is_error_reply(&reply) {
            return TickOutcome::skipped(TickStage::Reasoning, reply);
        }

        let decision = ResponseParser::parse(&reply);
        if self.config.log_reasoning {
            tracing::info!(agent = %self.id, reasoning = %decision.reasoning, "agent reasoning");
        } else {
            tracing::debug!(agent = %self.id, reasoning = %decision.reasoning, "agent reasoning");
        }

        if decision.is_noop() {
            return TickOutcome::skipped(TickStage::Parsing, "reply contained no actions");
        }

        let summary = self.dispatcher.dispatch(&decision);
        TickOutcome::Dispatched {
            reasoning: decision.reasoning,
            summary,
        }
    }

    async fn probe_health(&self) -> bool {
        let healthy = self.backend.check_health(&self.shutdown).await;
        self.status.send_modify(|s| s.healthy = Some(healthy));
        healthy
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.status.send_if_modified(|s| {
            let changed = s.phase != phase;
            s.phase = phase;
            changed
        });
    }

    fn stop_with(&self, reason: Option<String>) {
        self.status.send_modify(|s| {
            s.phase = LoopPhase::Stopped;
            s.stop_reason = reason;
        });
    }

    fn record(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Skipped { stage, reason } => {
                tracing::warn!(agent = %self.id, %stage, %reason, "tick skipped");
            }
            TickOutcome::Dispatched { summary, .. } => {
                tracing::debug!(
                    agent = %self.id,
                    executed = summary.executed,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "decision dispatched"
                );
            }
            TickOutcome::Cancelled => {
                tracing::debug!(agent = %self.id, "tick cancelled; result discarded");
            }
        }

        self.status.send_modify(|s| {
            s.last_tick_at = Some(Utc::now());
            match outcome {
                TickOutcome::Idle => s.ticks_idle += 1,
                TickOutcome::Skipped { .. } | TickOutcome::Cancelled => s.ticks_skipped += 1,
                TickOutcome::Dispatched { reasoning, .. } => {
                    s.ticks_completed += 1;
                    s.last_reasoning = Some(reasoning.clone());
                }
            }
        });
    }
}

/// Resolves once the active flag equals `wanted`; never resolves if the
/// control channel closes first
async fn wait_for_flag(active_rx: &mut watch::Receiver<bool>, wanted: bool) {
    let reached = active_rx.wait_for(|active| *active == wanted).await.is_ok();
    if !reached {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`AgentLoop`]; every collaborator is required
#[derive(Default)]
pub struct AgentLoopBuilder {
    backend: Option<Arc<dyn ReasoningBackend>>,
    perception: Option<Arc<dyn Perception>>,
    capabilities: Option<Arc<dyn Capabilities>>,
    config: LoopConfig,
}

impl AgentLoopBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: Arc<dyn ReasoningBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn perception(mut self, perception: Arc<dyn Perception>) -> Self {
        self.perception = Some(perception);
        self
    }

    pub fn capabilities(mut self, capabilities: Arc<dyn Capabilities>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AgentLoop> {
        let backend = self
            .backend
            .ok_or_else(|| AgentError::Startup("reasoning backend is required".into()))?;
        let perception = self
            .perception
            .ok_or_else(|| AgentError::Startup("controlled agent perception is required".into()))?;
        let capabilities = self
            .capabilities
            .ok_or_else(|| {
                AgentError::Startup("controlled agent capabilities are required".into())
            })?;

        Ok(AgentLoop::new(backend, perception, capabilities, self.config))
    }
}
