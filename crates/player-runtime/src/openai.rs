//! OpenAI-compatible Backend
//!
//! Chat-completions API (OpenAI, OpenRouter, vLLM, LM Studio, ...) with the
//! capture sent as an inline PNG image part.

use async_trait::async_trait;
use player_core::AgentError;
use player_core::error::Result;
use player_core::provider::{ProviderConfig, ReasoningBackend, ReasoningRequest};
use serde::{Deserialize, Serialize};

use crate::http;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions backend with bearer authentication
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAiBackend {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            config,
        })
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }

    fn build_request<'a>(&'a self, request: &'a ReasoningRequest) -> ChatRequest<'a> {
        let mut parts = vec![ContentPart::Text {
            text: &request.user_prompt,
        }];
        if let Some(image) = &request.image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/png;base64,{}", http::encode_image(image)),
                },
            });
        }

        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.system_prompt),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(parts),
                },
            ],
        }
    }

    fn extract_text(response: ChatResponse) -> Result<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::Provider("response contained no choices".into()))
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn validate_config(&self) -> Result<()> {
        self.config.validate()
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url());
        let body = self.build_request(request);

        let response: ChatResponse =
            http::send_json(self.client.post(&url).bearer_auth(self.api_key()).json(&body)).await?;
        Self::extract_text(response)
    }

    async fn probe(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url());
        http::probe(&self.client, &url, Some(self.api_key())).await
    }
}

#[cfg(test)]
mod tests {
    use player_core::CancellationToken;
    use player_core::provider::is_error_reply;
    use serde_json::json;

    use super::*;

    fn backend(endpoint: &str) -> OpenAiBackend {
        OpenAiBackend::new(ProviderConfig::openai_compatible(endpoint, "sk-test", "vision-model"))
            .unwrap()
    }

    #[test]
    fn test_payload_with_image() {
        let backend = backend("https://api.example.com/v1");
        let request = ReasoningRequest {
            image: Some(b"\x89PNG".to_vec()),
            system_prompt: "sys".into(),
            user_prompt: "state".into(),
        };

        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(
            payload,
            json!({
                "model": "vision-model",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": [
                        { "type": "text", "text": "state" },
                        {
                            "type": "image_url",
                            "image_url": { "url": "data:image/png;base64,iVBORw==" }
                        }
                    ]}
                ]
            })
        );
    }

    #[test]
    fn test_payload_without_image() {
        let backend = backend("https://api.example.com/v1");
        let request = ReasoningRequest {
            user_prompt: "state".into(),
            ..Default::default()
        };

        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(payload["messages"][1]["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_text() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Reasoning: ok" }
            }]
        }))
        .unwrap();
        assert_eq!(OpenAiBackend::extract_text(response).unwrap(), "Reasoning: ok");

        let empty: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(OpenAiBackend::extract_text(empty).is_err());
    }

    #[test]
    fn test_validate_requires_key() {
        let mut config = ProviderConfig::openai_compatible("https://api.example.com/v1", "k", "m");
        config.api_key = None;
        let backend = OpenAiBackend::new(config).unwrap();
        assert!(backend.validate_config().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let backend = backend("http://127.0.0.1:9/v1");
        let cancel = CancellationToken::new();

        assert!(!backend.check_health(&cancel).await);

        let reply = backend.get_response(&ReasoningRequest::default(), &cancel).await.unwrap();
        assert!(is_error_reply(&reply));
    }
}
