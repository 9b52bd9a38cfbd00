//! Runtime Settings
//!
//! Everything the binary needs, read from environment variables (a `.env`
//! file is loaded by the binary before this runs).

use std::path::Path;
use std::str::FromStr;

use player_core::AgentError;
use player_core::agent_loop::LoopConfig;
use player_core::error::Result;
use player_core::provider::{ProviderConfig, ProviderKind};

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:4b";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "google/gemma-2-9b-it:free";
pub const DEFAULT_KOBOLD_ENDPOINT: &str = "http://localhost:5001";
pub const DEFAULT_RESOLUTION: u32 = 512;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Resolved runtime settings
#[derive(Clone, Debug)]
pub struct Settings {
    pub provider: ProviderConfig,
    pub loop_config: LoopConfig,

    /// Number of agents to spawn
    pub agent_count: usize,

    /// Square capture resolution handed to perception
    pub perception_resolution: u32,

    /// Control server address
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let kind: ProviderKind = var("LLM_PROVIDER")
            .map_or(Ok(ProviderKind::Ollama), |v| v.parse())?;
        let provider = match kind {
            ProviderKind::Ollama => ProviderConfig::ollama(
                or("OLLAMA_ENDPOINT", DEFAULT_OLLAMA_ENDPOINT),
                or("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            ),
            ProviderKind::OpenAiCompatible => ProviderConfig {
                kind,
                endpoint: or("OPENAI_ENDPOINT", DEFAULT_OPENAI_ENDPOINT),
                model: or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                api_key: var("OPENAI_API_KEY"),
            },
            ProviderKind::Kobold => ProviderConfig::kobold(
                or("KOBOLD_ENDPOINT", DEFAULT_KOBOLD_ENDPOINT),
                or("KOBOLD_MODEL", ""),
            ),
        };

        let mut loop_config = LoopConfig::default();
        if let Some(rate) = parse_var::<f32>(&var, "AGENT_TICK_RATE")? {
            loop_config.tick_rate = rate;
        }
        if let Some(verbose) = parse_bool(&var, "AGENT_VERBOSE_LOGGING")? {
            loop_config.log_reasoning = verbose;
        }
        if let Some(active) = parse_bool(&var, "AGENT_START_ACTIVE")? {
            loop_config.start_active = active;
        }
        if let Some(reprobe) = parse_bool(&var, "AGENT_REPROBE_ON_RESUME")? {
            loop_config.reprobe_on_resume = reprobe;
        }
        if let Some(path) = var("AGENT_SYSTEM_PROMPT_FILE") {
            loop_config.system_prompt = read_prompt(Path::new(&path))?;
        }

        let agent_count = parse_var::<usize>(&var, "AGENT_COUNT")?.unwrap_or(1);
        if agent_count == 0 {
            return Err(AgentError::Config("AGENT_COUNT must be at least 1".into()));
        }

        let perception_resolution =
            parse_var::<u32>(&var, "PERCEPTION_RESOLUTION")?.unwrap_or(DEFAULT_RESOLUTION);
        if perception_resolution == 0 {
            return Err(AgentError::Config("PERCEPTION_RESOLUTION must be positive".into()));
        }

        Ok(Self {
            provider,
            loop_config,
            agent_count,
            perception_resolution,
            bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.parse()
                .map_err(|e| AgentError::Config(format!("{key}='{raw}' is invalid: {e}")))
        })
        .transpose()
}

fn parse_bool(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    var(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AgentError::Config(format!("{key}='{raw}' is not a boolean"))),
        })
        .transpose()
}

fn read_prompt(path: &Path) -> Result<String> {
    let prompt = std::fs::read_to_string(path).map_err(|e| {
        AgentError::Config(format!("cannot read system prompt '{}': {e}", path.display()))
    })?;
    if prompt.trim().is_empty() {
        return Err(AgentError::Config(format!("system prompt '{}' is empty", path.display())));
    }
    Ok(prompt)
}
