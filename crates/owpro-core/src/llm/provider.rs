//! ModelProvider trait definition.
//!
//! This is the adapter capability both provider variants implement: the
//! local inference server and the remote hosted API. Each adapter owns the
//! translation between its native wire schema and the shared types.
//! Uses RPITIT for `health_check` and `generate`, and `Pin<Box<dyn Stream>>`
//! for `generate_stream` (streams must be `'static` so they can outlive the
//! borrow of the provider).

use std::pin::Pin;

use futures_util::Stream;

use owpro_types::llm::{
    ProviderChunk, ProviderError, ProviderKind, ProviderRequest, ProviderResponse,
};

/// Boxed stream of provider chunks.
pub type ChunkStream =
    Pin<Box<dyn Stream<Item = Result<ProviderChunk, ProviderError>> + Send + 'static>>;

/// Trait for model provider backends (Ollama, OpenAI).
///
/// Implementations live in owpro-infra.
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Which routing class this provider belongs to.
    fn kind(&self) -> ProviderKind;

    /// Provider-specific model id for a registry model id.
    ///
    /// The default passes ids through unchanged.
    fn translate_model(&self, model_id: &str) -> String {
        model_id.to_string()
    }

    /// List the models the provider currently serves.
    ///
    /// Any failure means the provider is not reachable; callers bound this
    /// call with a timeout.
    fn health_check(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ProviderError>> + Send;

    /// Send a generation request and receive the full response.
    fn generate(
        &self,
        request: &ProviderRequest,
    ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send;

    /// Send a streaming generation request.
    ///
    /// No network activity happens until the stream is first polled.
    /// Dropping the stream releases the underlying connection.
    fn generate_stream(&self, request: ProviderRequest) -> ChunkStream;
}
