//! Model provider implementations.
//!
//! Contains the two concrete implementations of the
//! [`ModelProvider`](owpro_core::llm::provider::ModelProvider) trait: the
//! local Ollama server and the remote OpenAI API.
//!
//! Also provides the provider factory ([`create_providers`]) that builds the
//! [`ProviderSet`] the router dispatches through, and the HTTP error mapping
//! both adapters share.

pub mod ollama;
pub mod openai;

use std::time::Duration;

use secrecy::SecretString;

use owpro_core::llm::box_provider::{BoxModelProvider, ProviderSet};
use owpro_types::config::{GatewayConfig, RemoteProviderConfig};
use owpro_types::llm::ProviderError;

use self::ollama::OllamaProvider;
use self::openai::OpenAiProvider;

/// Build both provider adapters from the gateway configuration.
///
/// `api_key` is the resolved remote credential (see [`resolve_api_key`]).
/// A missing key is not an error here: the remote provider is still
/// constructed and reports [`ProviderError::AuthenticationFailed`] on use,
/// so local-only deployments keep working.
///
/// # Errors
///
/// Returns [`ProviderError::Transport`] if an HTTP client cannot be built.
pub fn create_providers(
    config: &GatewayConfig,
    api_key: Option<SecretString>,
) -> Result<ProviderSet, ProviderError> {
    let local = OllamaProvider::from_config(&config.local)?;

    if api_key.is_none() {
        tracing::warn!(
            env = %config.remote.api_key_env,
            "No remote API key configured; remote dispatch will fail"
        );
    }
    let remote = OpenAiProvider::from_config(&config.remote, api_key)?;

    tracing::debug!(
        local = %local.base_url(),
        remote = %remote.base_url(),
        "Providers created"
    );

    Ok(ProviderSet::new(
        BoxModelProvider::new(local),
        BoxModelProvider::new(remote),
    ))
}

/// Read the remote API key from the environment variable named in config.
///
/// Empty values count as missing.
pub fn resolve_api_key(config: &RemoteProviderConfig) -> Option<SecretString> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

/// Map a reqwest send/read failure to a [`ProviderError`].
pub(crate) fn map_transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Map a non-success HTTP response to a [`ProviderError`], consuming the body.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    if status == 401 || status == 403 {
        return ProviderError::AuthenticationFailed;
    }
    let body = response.text().await.unwrap_or_default();
    ProviderError::Status { status, body }
}
