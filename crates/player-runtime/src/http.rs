//! Shared HTTP plumbing for the reqwest-based backends

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use player_core::AgentError;
use player_core::error::Result;
use serde::de::DeserializeOwned;

/// Bound on establishing a connection; the whole call is bounded by the loop
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| AgentError::Startup(format!("failed to create HTTP client: {e}")))
}

/// Base64 for image transport
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Send a prepared request and decode a JSON body, mapping every failure
/// (transport, non-2xx status, malformed body) to `AgentError::Provider`
pub async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::Provider(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::Provider(format!("HTTP {status}: {}", body.trim())));
    }

    response
        .json()
        .await
        .map_err(|e| AgentError::Provider(format!("malformed response: {e}")))
}

/// GET probe; reachable means a 2xx answer
pub async fn probe(client: &reqwest::Client, url: &str, bearer: Option<&str>) -> Result<bool> {
    let mut request = client.get(url);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    match request.send().await {
        Ok(resp) => Ok(resp.status().is_success()),
        Err(e) => Err(AgentError::ProviderUnavailable(e.to_string())),
    }
}
