//! OllamaProvider -- concrete [`ModelProvider`] for a local Ollama server.
//!
//! Talks to the native Ollama API: `GET /api/tags` for liveness and the
//! installed model list, `POST /api/chat` for generation (single JSON
//! object, or NDJSON when streaming).

use std::time::Duration;

use owpro_core::llm::provider::{ChunkStream, ModelProvider};
use owpro_observe::genai_attrs::PROVIDER_OLLAMA;
use owpro_types::config::LocalProviderConfig;
use owpro_types::llm::{ProviderError, ProviderKind, ProviderRequest, ProviderResponse};

use super::streaming::create_ollama_stream;
use super::types::{
    OllamaChatRequest, OllamaChatResponse, OllamaMessage, OllamaOptions, OllamaTagsResponse,
};
use crate::llm::{map_transport_error, status_error};

/// Local Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url` (e.g. `http://localhost:11434`).
    ///
    /// `request_timeout` bounds non-streaming generation; streams are
    /// bounded only by the connect timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn from_config(config: &LocalProviderConfig) -> Result<Self, ProviderError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_ollama_request(&self, request: &ProviderRequest, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_OLLAMA
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn health_check(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            ProviderError::Deserialization(format!("failed to parse /api/tags: {e}"))
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = self.to_ollama_request(request, false);

        let response = self
            .client
            .post(self.url("/api/chat"))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let chat: OllamaChatResponse = response.json().await.map_err(|e| {
            ProviderError::Deserialization(format!("failed to parse /api/chat response: {e}"))
        })?;
        if let Some(error) = chat.error {
            return Err(ProviderError::Status {
                status: 200,
                body: error,
            });
        }

        Ok(ProviderResponse {
            content: chat.content().to_string(),
            usage: chat.usage(),
            model: if chat.model.is_empty() {
                request.model.clone()
            } else {
                chat.model
            },
        })
    }

    fn generate_stream(&self, request: ProviderRequest) -> ChunkStream {
        let body = self.to_ollama_request(&request, true);
        create_ollama_stream(
            &self.client,
            &self.url("/api/chat"),
            body,
            self.request_timeout,
        )
    }
}
