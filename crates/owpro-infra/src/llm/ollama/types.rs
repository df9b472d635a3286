//! Ollama HTTP API types.
//!
//! These are Ollama-specific request/response structures for `/api/chat`
//! and `/api/tags`. They are NOT the shared types from owpro-types.

use serde::{Deserialize, Serialize};

use owpro_types::llm::{ProviderChunk, ProviderError, Usage};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Sampling options. `num_predict` is Ollama's name for max output tokens.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

/// One `/api/chat` response object.
///
/// Non-streaming calls return exactly one; streaming calls return one per
/// NDJSON line, the last with `done: true` and the token counts.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Set instead of `message` when generation fails.
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaChatResponse {
    pub fn content(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }

    /// Token counts, if Ollama reported any.
    ///
    /// Ollama omits `prompt_eval_count` when the prompt was cached, so a
    /// single missing side counts as zero.
    pub fn usage(&self) -> Option<Usage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage::new(
                prompt.unwrap_or(0),
                completion.unwrap_or(0),
            )),
        }
    }

    /// Convert one streamed object into a provider chunk.
    pub fn into_chunk(self) -> Result<ProviderChunk, ProviderError> {
        if let Some(error) = self.error {
            return Err(ProviderError::Stream(error));
        }
        let usage = if self.done { self.usage() } else { None };
        Ok(ProviderChunk {
            content_delta: self.content().to_string(),
            done: self.done,
            usage,
        })
    }
}

/// Response body of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModelTag>,
}

/// One locally installed model, named `name:tag`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelTag {
    pub name: String,
}
