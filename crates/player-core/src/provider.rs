//! Reasoning Backend Strategy Pattern
//!
//! Defines the common interface for all language-model backends (Ollama,
//! OpenAI-compatible, KoboldCpp) so the agent loop works with any of them
//! without code changes. Concrete backends only translate requests and
//! responses; timing, cancellation and error marking live here.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use player_core::provider::{ReasoningBackend, ReasoningRequest};
//!
//! let backend = OllamaBackend::new(config)?;
//! backend.validate_config()?;
//! let reply = backend.get_response(&request, &cancel).await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};

/// Prefix marking a reply as a backend failure rather than a completion
pub const ERROR_MARKER: &str = "Error: ";

/// Upper bound on a health probe
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an error-marked reply
pub fn error_reply(reason: impl fmt::Display) -> String {
    format!("{ERROR_MARKER}{reason}")
}

/// Whether a reply is an error-marked failure
pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with(ERROR_MARKER)
}

// ============================================================================
// Configuration
// ============================================================================

/// Supported backend families
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local Ollama server (`/api/generate`)
    #[default]
    Ollama,
    /// Hosted chat-completions API with bearer credential
    OpenAiCompatible,
    /// Local KoboldCpp server (`/api/v1/generate`)
    Kobold,
}

impl ProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAiCompatible => "openai",
            Self::Kobold => "kobold",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openaicompatible" => Ok(Self::OpenAiCompatible),
            "kobold" | "koboldcpp" => Ok(Self::Kobold),
            _ => Err(AgentError::Config(format!("unsupported provider type '{s}'"))),
        }
    }
}

/// Connection data for one backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Base URL, e.g. `http://localhost:11434`
    pub endpoint: String,

    /// Model identifier; optional for KoboldCpp, which serves one model
    #[serde(default)]
    pub model: String,

    /// Bearer credential for hosted APIs
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Ollama,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn openai_compatible(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            kind: ProviderKind::OpenAiCompatible,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: Some(api_key.into()),
        }
    }

    pub fn kobold(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Kobold,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        }
    }

    /// Endpoint without trailing slashes, ready for path joining
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }

    /// Local validation; never touches the network
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(AgentError::Config(format!("{} endpoint is not configured", self.kind)));
        }

        let url = url::Url::parse(endpoint).map_err(|e| {
            AgentError::Config(format!("{} endpoint '{endpoint}' is invalid: {e}", self.kind))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AgentError::Config(format!(
                "{} endpoint '{endpoint}' must be an absolute http(s) URL",
                self.kind
            )));
        }

        let model_required = !matches!(self.kind, ProviderKind::Kobold);
        if model_required && self.model.trim().is_empty() {
            return Err(AgentError::Config(format!("{} model name is not configured", self.kind)));
        }

        if self.kind == ProviderKind::OpenAiCompatible
            && self.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(AgentError::Config(format!("{} API key is not configured", self.kind)));
        }

        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// Everything a backend needs for one completion
#[derive(Clone, Debug, Default)]
pub struct ReasoningRequest {
    /// Encoded viewpoint capture (PNG), if perception produced one
    pub image: Option<Vec<u8>>,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Strategy trait for reasoning backends
///
/// Implementors provide `complete` and `probe`; the loop only calls the
/// provided `get_response` and `check_health`, which add cancellation,
/// error marking and the health-check bound.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Check required fields locally
    fn validate_config(&self) -> Result<()>;

    /// Issue one completion request and return the model's text
    async fn complete(&self, request: &ReasoningRequest) -> Result<String>;

    /// Cheap reachability probe (metadata fetch or similar)
    async fn probe(&self) -> Result<bool>;

    /// Completion text, or an error-marked reply on failure.
    ///
    /// Only cancellation is returned as `Err`, so callers can tell "backend
    /// failed" from "caller gave up".
    async fn get_response(
        &self,
        request: &ReasoningRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AgentError::Cancelled),
            result = self.complete(request) => match result {
                Ok(text) => Ok(text),
                Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
                Err(e) => {
                    tracing::warn!(backend = self.name(), error = %e, "completion failed");
                    Ok(error_reply(e))
                }
            },
        }
    }

    /// `true` only if the probe succeeds within [`HEALTH_CHECK_TIMEOUT`]
    async fn check_health(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            outcome = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.probe()) => match outcome {
                Ok(Ok(healthy)) => healthy,
                Ok(Err(e)) => {
                    tracing::warn!(backend = self.name(), error = %e, "health probe failed");
                    false
                }
                Err(_) => {
                    tracing::warn!(backend = self.name(), "health probe timed out");
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedBackend {
        reply: Result<String>,
        healthy: bool,
        probe_delay: Duration,
    }

    impl CannedBackend {
        fn replying(reply: Result<String>) -> Self {
            Self {
                reply,
                healthy: true,
                probe_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ReasoningBackend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        fn validate_config(&self) -> Result<()> {
            Ok(())
        }

        async fn complete(&self, _request: &ReasoningRequest) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AgentError::Provider(e.to_string())),
            }
        }

        async fn probe(&self) -> Result<bool> {
            tokio::time::sleep(self.probe_delay).await;
            Ok(self.healthy)
        }
    }

    #[test]
    fn test_error_marker() {
        let reply = error_reply("HTTP 503");
        assert_eq!(reply, "Error: HTTP 503");
        assert!(is_error_reply(&reply));
        assert!(!is_error_reply("Reasoning: fine"));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAiCompatible);
        assert_eq!(
            "OpenAI_Compatible".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCompatible
        );
        assert_eq!("koboldcpp".parse::<ProviderKind>().unwrap(), ProviderKind::Kobold);
        assert!("llamafile".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_validate_ok() {
        ProviderConfig::ollama("http://localhost:11434", "gemma3:4b").validate().unwrap();
        ProviderConfig::openai_compatible("https://openrouter.ai/api/v1", "sk-test", "m")
            .validate()
            .unwrap();
        // Kobold serves a single model, so the name is optional.
        ProviderConfig::kobold("http://localhost:5001", "").validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_endpoints() {
        for endpoint in ["", "   ", "localhost:11434", "not a url", "ftp://host/models"] {
            let err = ProviderConfig::ollama(endpoint, "gemma3:4b").validate().unwrap_err();
            assert!(matches!(err, AgentError::Config(_)), "{endpoint:?}");
        }
    }

    #[test]
    fn test_validate_requires_model_and_key() {
        assert!(ProviderConfig::ollama("http://localhost:11434", " ").validate().is_err());

        let mut openai = ProviderConfig::openai_compatible("https://api.example.com/v1", "", "m");
        assert!(openai.validate().is_err());
        openai.api_key = None;
        assert!(openai.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config =
            ProviderConfig::openai_compatible("https://api.example.com/v1", "sk-secret", "m");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_base_url_trims_slashes() {
        let config = ProviderConfig::kobold("http://localhost:5001//", "");
        assert_eq!(config.base_url(), "http://localhost:5001");
    }

    #[tokio::test]
    async fn test_get_response_marks_errors() {
        let backend = CannedBackend::replying(Err(AgentError::Provider("HTTP 500".into())));
        let reply = backend
            .get_response(&ReasoningRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(is_error_reply(&reply));
        assert!(reply.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_get_response_propagates_cancellation() {
        let backend = CannedBackend::replying(Ok("Reasoning: x".into()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = backend.get_response(&ReasoningRequest::default(), &cancel).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_health_times_out() {
        let mut backend = CannedBackend::replying(Ok(String::new()));
        backend.probe_delay = HEALTH_CHECK_TIMEOUT * 2;

        assert!(!backend.check_health(&CancellationToken::new()).await);
    }

    #[tokio::test]
    async fn test_check_health_reports_probe() {
        let mut backend = CannedBackend::replying(Ok(String::new()));
        assert!(backend.check_health(&CancellationToken::new()).await);

        backend.healthy = false;
        assert!(!backend.check_health(&CancellationToken::new()).await);
    }
}
