//! Connection settings for the OpenAI provider.
//!
//! Built from the `[remote]` config section plus the API key resolved from
//! the environment.

use std::collections::HashMap;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use secrecy::{ExposeSecret, SecretString};

use owpro_types::config::RemoteProviderConfig;

/// Settings used to construct an [`super::OpenAiProvider`].
pub struct OpenAiSettings {
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key; `None` makes every call fail with an authentication error.
    pub api_key: Option<SecretString>,
    /// Registry id -> OpenAI model id, applied by `translate_model`.
    pub model_aliases: HashMap<String, String>,
    /// Bound on a single non-streaming call and on opening a stream.
    pub request_timeout: Duration,
}

impl OpenAiSettings {
    pub fn from_remote_config(config: &RemoteProviderConfig, api_key: Option<SecretString>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model_aliases: config.model_aliases.clone(),
            request_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// async-openai client configuration.
    pub(crate) fn client_config(&self) -> OpenAIConfig {
        let config = OpenAIConfig::new().with_api_base(&self.base_url);
        match &self.api_key {
            Some(key) => config.with_api_key(key.expose_secret()),
            None => config,
        }
    }
}

/// Settings for the public OpenAI endpoint with default aliases.
pub fn openai_defaults(api_key: Option<SecretString>) -> OpenAiSettings {
    OpenAiSettings::from_remote_config(&RemoteProviderConfig::default(), api_key)
}
