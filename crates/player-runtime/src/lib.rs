//! # player-runtime
//!
//! Concrete reasoning backends and runtime settings for llm-player.
//!
//! ## Backends
//!
//! - **Ollama** (default): local inference through the generate API
//! - **OpenAI-compatible**: any chat-completions API with bearer auth
//! - **KoboldCpp**: local single-model server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use player_runtime::{Settings, create_backend};
//!
//! let settings = Settings::from_env()?;
//! let backend = create_backend(settings.provider.clone())?;
//! let agent = AgentLoop::builder()
//!     .backend(backend)
//!     .perception(world.clone())
//!     .capabilities(world)
//!     .config(settings.loop_config.clone())
//!     .build()?;
//! ```

mod http;

pub mod factory;
pub mod kobold;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;
pub mod settings;

pub use factory::create_backend;
pub use kobold::KoboldBackend;
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use settings::Settings;

// Re-export core types for convenience
pub use player_core::{
    AgentError, AgentFleet, AgentLoop, LoopConfig, ProviderConfig, ProviderKind,
    ReasoningBackend, Result,
};
