//! BoxModelProvider -- object-safe dynamic dispatch wrapper for ModelProvider.
//!
//! 1. Define an object-safe `ModelProviderDyn` trait with boxed futures
//! 2. Blanket-impl `ModelProviderDyn` for all `T: ModelProvider`
//! 3. `BoxModelProvider` wraps `Box<dyn ModelProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use owpro_types::llm::{ProviderError, ProviderKind, ProviderRequest, ProviderResponse};

use super::provider::{ChunkStream, ModelProvider};

/// Object-safe version of [`ModelProvider`] with boxed futures.
pub trait ModelProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn translate_model(&self, model_id: &str) -> String;

    fn health_check_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, ProviderError>> + Send + 'a>>;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a ProviderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + 'a>>;

    fn generate_stream_boxed(&self, request: ProviderRequest) -> ChunkStream;
}

impl<T: ModelProvider> ModelProviderDyn for T {
    fn name(&self) -> &str {
        ModelProvider::name(self)
    }

    fn kind(&self) -> ProviderKind {
        ModelProvider::kind(self)
    }

    fn translate_model(&self, model_id: &str) -> String {
        ModelProvider::translate_model(self, model_id)
    }

    fn health_check_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, ProviderError>> + Send + 'a>> {
        Box::pin(self.health_check())
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a ProviderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }

    fn generate_stream_boxed(&self, request: ProviderRequest) -> ChunkStream {
        self.generate_stream(request)
    }
}

/// Type-erased model provider.
///
/// Since `ModelProvider` uses RPITIT, it cannot be used as a trait object
/// directly. The router holds one `BoxModelProvider` per provider kind.
pub struct BoxModelProvider {
    inner: Box<dyn ModelProviderDyn + Send + Sync>,
}

impl BoxModelProvider {
    /// Wrap a concrete `ModelProvider` in a type-erased box.
    pub fn new<T: ModelProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    pub fn translate_model(&self, model_id: &str) -> String {
        self.inner.translate_model(model_id)
    }

    pub async fn health_check(&self) -> Result<Vec<String>, ProviderError> {
        self.inner.health_check_boxed().await
    }

    pub async fn generate(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.inner.generate_boxed(request).await
    }

    pub fn generate_stream(&self, request: ProviderRequest) -> ChunkStream {
        self.inner.generate_stream_boxed(request)
    }
}

/// The two provider variants the router chooses between.
#[derive(Clone)]
pub struct ProviderSet {
    local: Arc<BoxModelProvider>,
    remote: Arc<BoxModelProvider>,
}

impl ProviderSet {
    pub fn new(local: BoxModelProvider, remote: BoxModelProvider) -> Self {
        Self {
            local: Arc::new(local),
            remote: Arc::new(remote),
        }
    }

    /// The provider serving the given kind.
    pub fn get(&self, kind: ProviderKind) -> &Arc<BoxModelProvider> {
        match kind {
            ProviderKind::Local => &self.local,
            ProviderKind::Remote => &self.remote,
        }
    }
}
