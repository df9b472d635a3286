//! Gateway configuration types.
//!
//! `GatewayConfig` represents the top-level `config.toml`: server binding,
//! the local and remote provider endpoints, probe behaviour, the model
//! registry and the pricing table. All fields have defaults that match the
//! stock deployment (Ollama on localhost, OpenAI hosted API).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::llm::{ModelDescriptor, ProviderKind};

/// Top-level configuration for the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub local: LocalProviderConfig,

    #[serde(default)]
    pub remote: RemoteProviderConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    /// Model registry. Empty means "use the built-in table".
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,

    /// Ordered pricing rules; first matching pattern wins. Empty means
    /// "use the built-in table".
    #[serde(default)]
    pub pricing: Vec<ModelPricing>,
}

impl GatewayConfig {
    /// The configured model table, or the built-in one when none is given.
    pub fn effective_models(&self) -> Vec<ModelDescriptor> {
        if self.models.is_empty() {
            default_models()
        } else {
            self.models.clone()
        }
    }

    /// The configured pricing rules, or the built-in ones when none are given.
    pub fn effective_pricing(&self) -> Vec<ModelPricing> {
        if self.pricing.is_empty() {
            default_pricing()
        } else {
            self.pricing.clone()
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin for the frontend; `None` allows any origin.
    #[serde(default)]
    pub frontend_url: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: None,
        }
    }
}

/// Local inference server (Ollama).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default = "default_local_url")]
    pub base_url: String,
    /// Request timeout for generation calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_local_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_url(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Hosted OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    #[serde(default = "default_remote_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Translation of local model ids to remote model ids, used when a
    /// local-kind model is dispatched remotely.
    #[serde(default = "default_model_aliases")]
    pub model_aliases: HashMap<String, String>,
}

fn default_remote_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model_aliases() -> HashMap<String, String> {
    HashMap::from([
        ("llama2".to_string(), "gpt-3.5-turbo".to_string()),
        ("mistral".to_string(), "gpt-3.5-turbo".to_string()),
    ])
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_request_timeout_secs(),
            model_aliases: default_model_aliases(),
        }
    }
}

/// Health probe behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Upper bound for a single liveness call.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// How long a probe result may be reused. `0` re-probes on every routing
    /// decision.
    #[serde(default = "default_probe_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_probe_cache_ttl_ms() -> u64 {
    5000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            cache_ttl_ms: default_probe_cache_ttl_ms(),
        }
    }
}

/// Per-token price for model ids containing `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Substring matched against the model id (e.g. "gpt-4").
    pub pattern: String,
    /// Cost per thousand tokens in USD.
    pub cost_per_thousand: f64,
}

/// Built-in model table.
pub fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("llama2", ProviderKind::Local, 4096, 2048, 0.7),
        ModelDescriptor::new("mistral", ProviderKind::Local, 8192, 4096, 0.7),
        ModelDescriptor::new("gpt-4", ProviderKind::Remote, 8192, 4096, 0.7),
        ModelDescriptor::new("gpt-3.5-turbo", ProviderKind::Remote, 4096, 2048, 0.7),
    ]
}

/// Built-in pricing: GPT-4 family at $0.03/1K tokens, GPT-3.5 at $0.002/1K.
/// Local models are free.
pub fn default_pricing() -> Vec<ModelPricing> {
    vec![
        ModelPricing {
            pattern: "gpt-4".to_string(),
            cost_per_thousand: 0.03,
        },
        ModelPricing {
            pattern: "gpt-3.5".to_string(),
            cost_per_thousand: 0.002,
        },
    ]
}
