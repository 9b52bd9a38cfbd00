//! KoboldCpp Backend
//!
//! Single-prompt generate API. System and user text are folded into one
//! chat-shaped prompt; the capture goes in the `images` field.

use async_trait::async_trait;
use player_core::AgentError;
use player_core::error::Result;
use player_core::provider::{ProviderConfig, ReasoningBackend, ReasoningRequest};
use serde::{Deserialize, Serialize};

use crate::http;

const MAX_CONTEXT_LENGTH: u32 = 2048;
const MAX_LENGTH: u32 = 512;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    max_context_length: u32,
    max_length: u32,
    quiet: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    results: Vec<GenerateResult>,
}

#[derive(Debug, Deserialize)]
struct GenerateResult {
    #[serde(default)]
    text: String,
}

/// KoboldCpp backend; serves whatever model the server loaded
pub struct KoboldBackend {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl KoboldBackend {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            config,
        })
    }

    fn build_request(request: &ReasoningRequest) -> GenerateRequest {
        GenerateRequest {
            prompt: format!(
                "{}\n\nUser: {}\nAssistant:",
                request.system_prompt, request.user_prompt
            ),
            images: request.image.iter().map(|png| http::encode_image(png)).collect(),
            max_context_length: MAX_CONTEXT_LENGTH,
            max_length: MAX_LENGTH,
            quiet: true,
        }
    }

    fn extract_text(response: GenerateResponse) -> Result<String> {
        response
            .results
            .into_iter()
            .next()
            .map(|r| r.text)
            .ok_or_else(|| AgentError::Provider("response contained no results".into()))
    }
}

#[async_trait]
impl ReasoningBackend for KoboldBackend {
    fn name(&self) -> &str {
        "kobold"
    }

    fn validate_config(&self) -> Result<()> {
        self.config.validate()
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        let url = format!("{}/api/v1/generate", self.config.base_url());
        let body = Self::build_request(request);

        let response: GenerateResponse = http::send_json(self.client.post(&url).json(&body)).await?;
        Self::extract_text(response)
    }

    async fn probe(&self) -> Result<bool> {
        let url = format!("{}/api/v1/model", self.config.base_url());
        http::probe(&self.client, &url, None).await
    }
}
