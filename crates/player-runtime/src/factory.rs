//! Backend Factory

use std::sync::Arc;

use player_core::error::Result;
use player_core::provider::{ProviderConfig, ProviderKind, ReasoningBackend};

use crate::kobold::KoboldBackend;
use crate::openai::OpenAiBackend;

/// Build the backend selected by `config.kind`.
///
/// Configuration is validated here, so a returned backend is ready to probe.
pub fn create_backend(config: ProviderConfig) -> Result<Arc<dyn ReasoningBackend>> {
    config.validate()?;

    let backend: Arc<dyn ReasoningBackend> = match config.kind {
        ProviderKind::Ollama => ollama_backend(config)?,
        ProviderKind::OpenAiCompatible => Arc::new(OpenAiBackend::new(config)?),
        ProviderKind::Kobold => Arc::new(KoboldBackend::new(config)?),
    };

    tracing::info!(backend = backend.name(), "reasoning backend created");
    Ok(backend)
}

#[cfg(feature = "ollama")]
fn ollama_backend(config: ProviderConfig) -> Result<Arc<dyn ReasoningBackend>> {
    Ok(Arc::new(crate::ollama::OllamaBackend::new(config)?))
}

#[cfg(not(feature = "ollama"))]
fn ollama_backend(_config: ProviderConfig) -> Result<Arc<dyn ReasoningBackend>> {
    Err(player_core::AgentError::Startup("built without the `ollama` feature".into()))
}
