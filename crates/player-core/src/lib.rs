//! # player-core
//!
//! Decision loop for an LLM-controlled game agent, independent of any
//! particular model server or game engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            AgentLoop                             │
//! │  ┌────────────┐  ┌────────────┐  ┌──────────────┐  ┌──────────┐  │
//! │  │ Perception │─►│  Prompt    │─►│  Reasoning   │─►│ Response │  │
//! │  │ (capture)  │  │  Builder   │  │  Backend     │  │  Parser  │  │
//! │  └────────────┘  └────────────┘  │  (Strategy)  │  └────┬─────┘  │
//! │                                  └──────────────┘       │        │
//! │                  ┌──────────────┐   ┌──────────────┐    │        │
//! │                  │ Capabilities │◄──│   Action     │◄───┘        │
//! │                  │   (host)     │   │  Dispatcher  │             │
//! │                  └──────────────┘   └──────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ReasoningBackend` trait lets the loop run against Ollama, an
//! OpenAI-compatible API or KoboldCpp without code changes; the host game
//! plugs in through `Perception` and `Capabilities`.

pub mod agent_loop;
pub mod decision;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod fleet;
pub mod observation;
pub mod parser;
pub mod prompt;
pub mod provider;

pub use agent_loop::{
    AgentHandle, AgentId, AgentLoop, AgentLoopBuilder, LoopConfig, LoopPhase, LoopStatus,
    TickOutcome, TickStage,
};
pub use decision::{Action, ActionKind, Decision, Direction};
pub use dispatcher::{ActionDispatcher, ActionOutcome, DispatchSummary};
pub use environment::{AgentVitals, Capabilities, Capture, Perception};
pub use error::{AgentError, Result};
pub use fleet::AgentFleet;
pub use observation::{HealthUnit, InventorySlot, NearbyObject, Observation, Vec3};
pub use parser::ResponseParser;
pub use prompt::{SYSTEM_PROMPT, build_prompt};
pub use provider::{ProviderConfig, ProviderKind, ReasoningBackend, ReasoningRequest};
pub use tokio_util::sync::CancellationToken;
