//! LLM request/response types for the gateway.
//!
//! These types model the data shapes shared by the router, the provider
//! adapters and the API layer: model descriptors, generation requests and
//! results, streaming events, usage accounting and error handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Which class of provider serves a model.
///
/// `Local` is the self-hosted inference server (Ollama), `Remote` the hosted
/// API (OpenAI). Routing always prefers `Local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Remote,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "ollama" => Ok(ProviderKind::Local),
            "remote" | "openai" => Ok(ProviderKind::Remote),
            other => Err(format!("invalid provider kind: '{other}'")),
        }
    }
}

/// Static per-model limits, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub provider_kind: ProviderKind,
    pub context_window: u32,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        provider_kind: ProviderKind,
        context_window: u32,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        Self {
            id: id.into(),
            provider_kind,
            context_window,
            max_tokens,
            temperature,
        }
    }
}

/// Per-request overrides of the descriptor defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// An inbound generation request, alive for the duration of one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model_id: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model_id: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Single-turn request from a bare prompt.
    pub fn from_prompt(model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            messages: vec![Message::user(prompt)],
            stream: false,
            fallback_model_id: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_fallback(mut self, fallback_model_id: impl Into<String>) -> Self {
        self.fallback_model_id = Some(fallback_model_id.into());
        self
    }
}

/// The request shape handed to a provider adapter after routing.
///
/// `model` is the provider-native identifier (after alias translation),
/// limits are already resolved against the model descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(default)]
    pub stream: bool,
}

/// Token usage for a completed generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt/completion counts, deriving the total.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A provider's non-streaming answer, before normalization.
///
/// `usage` is `None` when the provider did not report token counts, which
/// is distinct from a reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub model: String,
    pub content: String,
    pub usage: Option<Usage>,
}

/// One incremental piece of a provider's streaming output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderChunk {
    pub content_delta: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ProviderChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            content_delta: text.into(),
            done: false,
            usage: None,
        }
    }

    pub fn finished(usage: Option<Usage>) -> Self {
        Self {
            content_delta: String::new(),
            done: true,
            usage,
        }
    }
}

/// How the router reached the provider that served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Local model served by the healthy local provider.
    Local,
    /// Caller-supplied local fallback model served instead of the primary.
    Fallback,
    /// Remote provider, either directly or because the local one was down.
    Remote,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Local => write!(f, "local"),
            RouteKind::Fallback => write!(f, "fallback"),
            RouteKind::Remote => write!(f, "remote"),
        }
    }
}

/// The normalized result of a routed, non-streaming generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Logical model that served the request (the fallback id when it fired).
    pub model_id: String,
    pub provider: ProviderKind,
    /// Identifier sent to the provider after alias translation.
    pub provider_model: String,
    pub content: String,
    /// Zeroed when the provider reported nothing; see `usage_reported`.
    pub usage: Usage,
    pub usage_reported: bool,
    pub latency_ms: u64,
    pub route: RouteKind,
}

/// Uniform partial-result event of a streaming session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub model_id: String,
    pub content_delta: String,
    pub done: bool,
    pub latency_ms_so_far: u64,
    /// Set only on the terminal event of an aborted session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamEvent {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Liveness and model listing of one provider at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub provider: ProviderKind,
    pub available: bool,
    pub known_model_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn unavailable(provider: ProviderKind, error: impl Into<String>) -> Self {
        Self {
            provider,
            available: false,
            known_model_ids: Vec::new(),
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    /// Whether this probe says `model_id` can be served right now.
    ///
    /// An empty listing means the provider did not tell us which models it
    /// has, so any model is accepted. Ollama lists models as `name:tag`, so
    /// `llama2` matches `llama2:latest`.
    pub fn serves(&self, model_id: &str) -> bool {
        if !self.available {
            return false;
        }
        if self.known_model_ids.is_empty() {
            return true;
        }
        self.known_model_ids.iter().any(|known| {
            known == model_id
                || known
                    .strip_prefix(model_id)
                    .is_some_and(|rest| rest.starts_with(':'))
        })
    }
}

/// Accumulated usage of one model in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub requests: u64,
    /// USD, approximate.
    pub estimated_cost: f64,
}

/// Errors raised by a provider adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("authentication failed")]
    AuthenticationFailed,
}

impl ProviderError {
    /// Whether the provider could not be reached at all (as opposed to
    /// answering with an error).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ProviderError::Transport(_) | ProviderError::Timeout(_))
    }
}

/// A failed step recorded while routing a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub provider: ProviderKind,
    pub model_id: String,
    pub reason: String,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.provider, self.model_id, self.reason)
    }
}

/// Errors surfaced by the request router.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("model '{model_id}' not found")]
    ModelNotFound { model_id: String },

    #[error("{provider} provider unavailable")]
    ProviderUnavailable { provider: ProviderKind },

    #[error("{provider} provider error: {source}")]
    Provider {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },

    #[error("all providers exhausted: {}", format_attempts(.attempts))]
    AllProvidersExhausted { attempts: Vec<FailedAttempt> },

    #[error("context length exceeded for '{model_id}': max {max}, requested {requested}")]
    ContextLengthExceeded {
        model_id: String,
        max: u32,
        requested: u32,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn format_attempts(attempts: &[FailedAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RouteError {
    /// Whether the caller caused this error (bad model id, oversized prompt).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RouteError::ModelNotFound { .. }
                | RouteError::ContextLengthExceeded { .. }
                | RouteError::InvalidRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serde() {
        let role = MessageRole::Assistant;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: MessageRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessageRole::Assistant);
    }

    #[test]
    fn test_provider_kind_accepts_vendor_names() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::Remote);
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_usage_new_derives_total() {
        let usage = Usage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
        assert_eq!(Usage::new(u32::MAX, 1).total_tokens, u32::MAX);
    }

    #[test]
    fn test_generation_request_defaults() {
        let json = r#"{"model_id":"llama2","messages":[{"role":"user","content":"hi"}]}"#;
        let req: GenerationRequest = serde_json::from_str(json).unwrap();
        assert!(!req.stream);
        assert!(req.fallback_model_id.is_none());
        assert_eq!(req.options, GenerationOptions::default());
    }

    #[test]
    fn test_probe_serves_matches_ollama_tags() {
        let probe = ProbeResult {
            provider: ProviderKind::Local,
            available: true,
            known_model_ids: vec!["llama2:latest".into(), "mistral:7b".into()],
            latency_ms: Some(3),
            error: None,
        };
        assert!(probe.serves("llama2"));
        assert!(probe.serves("mistral"));
        assert!(probe.serves("mistral:7b"));
        assert!(!probe.serves("llama"));
        assert!(!probe.serves("gpt-4"));
    }

    #[test]
    fn test_probe_serves_empty_listing_accepts_any() {
        let probe = ProbeResult {
            provider: ProviderKind::Local,
            available: true,
            known_model_ids: vec![],
            latency_ms: None,
            error: None,
        };
        assert!(probe.serves("anything"));
        assert!(!ProbeResult::unavailable(ProviderKind::Local, "down").serves("anything"));
    }

    #[test]
    fn test_stream_event_skips_absent_error() {
        let event = StreamEvent {
            model_id: "llama2".into(),
            content_delta: "hi".into(),
            done: false,
            latency_ms_so_far: 5,
            error: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_exhausted_error_lists_attempts() {
        let err = RouteError::AllProvidersExhausted {
            attempts: vec![
                FailedAttempt {
                    provider: ProviderKind::Local,
                    model_id: "llama2".into(),
                    reason: "unavailable".into(),
                },
                FailedAttempt {
                    provider: ProviderKind::Remote,
                    model_id: "gpt-3.5-turbo".into(),
                    reason: "HTTP 500: boom".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("local (llama2): unavailable"));
        assert!(msg.contains("remote (gpt-3.5-turbo): HTTP 500: boom"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RouteError::ModelNotFound {
            model_id: "x".into()
        }
        .is_client_error());
        assert!(!RouteError::Provider {
            provider: ProviderKind::Remote,
            source: ProviderError::Timeout(100),
        }
        .is_client_error());
    }
}
