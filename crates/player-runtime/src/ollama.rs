//! Ollama Backend
//!
//! `ReasoningBackend` over a local Ollama server using the generate API, with
//! the capture attached as a base64 image.

use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::images::Image;
use player_core::AgentError;
use player_core::error::Result;
use player_core::provider::{ProviderConfig, ReasoningBackend, ReasoningRequest};

use crate::http;

/// Ollama backend
pub struct OllamaBackend {
    client: Ollama,
    config: ProviderConfig,
}

impl OllamaBackend {
    /// Create from a provider configuration; the endpoint must parse
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let (host, port) = split_endpoint(config.base_url())?;
        Ok(Self {
            client: Ollama::new(host, port),
            config,
        })
    }
}

/// Split an endpoint URL into the `scheme://host` and port pair the client takes.
///
/// The client always calls `/api/...` at the server root; endpoints with a
/// path are rejected.
fn split_endpoint(endpoint: &str) -> Result<(String, u16)> {
    let invalid =
        |reason: String| AgentError::Config(format!("ollama endpoint '{endpoint}' {reason}"));
    let url = url::Url::parse(endpoint).map_err(|e| invalid(format!("is invalid: {e}")))?;
    let host = url.host_str().ok_or_else(|| invalid("has no host".into()))?;
    if url.path() != "/" {
        return Err(invalid(format!("must not include a path (got '{}')", url.path())));
    }
    let port = url.port_or_known_default().unwrap_or(11434);

    Ok((format!("{}://{host}", url.scheme()), port))
}

#[async_trait]
impl ReasoningBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn validate_config(&self) -> Result<()> {
        self.config.validate()
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        let mut generation =
            GenerationRequest::new(self.config.model.clone(), request.user_prompt.clone())
                .system(request.system_prompt.clone());
        if let Some(png) = &request.image {
            generation = generation.add_image(Image::from_base64(&http::encode_image(png)));
        }

        let response = self
            .client
            .generate(generation)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(response.response)
    }

    async fn probe(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(error = %e, "ollama model listing failed");
                Ok(false)
            }
        }
    }
}
