//! Scriptable provider used by the router, prober and streaming tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use owpro_types::config::default_models;
use owpro_types::llm::{
    ProviderChunk, ProviderError, ProviderKind, ProviderRequest, ProviderResponse, Usage,
};

use super::box_provider::{BoxModelProvider, ProviderSet};
use super::health::HealthProber;
use super::ledger::UsageLedger;
use super::provider::{ChunkStream, ModelProvider};
use super::registry::ModelRegistry;
use super::router::RequestRouter;

#[derive(Clone)]
pub enum MockHealth {
    Up(Vec<String>),
    Down,
    Hang,
}

#[derive(Clone)]
pub enum MockReply {
    Ok { content: String, usage: Option<Usage> },
    Err(ProviderError),
}

/// Call counters shared between a mock and the test that built it.
#[derive(Default)]
pub struct MockCalls {
    pub health: AtomicUsize,
    pub generate: AtomicUsize,
    pub stream: AtomicUsize,
    pub streams_dropped: AtomicUsize,
    pub last_request: Mutex<Option<ProviderRequest>>,
}

impl MockCalls {
    pub fn health(&self) -> usize {
        self.health.load(Ordering::SeqCst)
    }

    pub fn generate(&self) -> usize {
        self.generate.load(Ordering::SeqCst)
    }

    pub fn stream(&self) -> usize {
        self.stream.load(Ordering::SeqCst)
    }

    pub fn dispatches(&self) -> usize {
        self.generate() + self.stream()
    }

    pub fn streams_dropped(&self) -> usize {
        self.streams_dropped.load(Ordering::SeqCst)
    }

    pub fn last_model(&self) -> Option<String> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.model.clone())
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

struct DropGuard(Arc<MockCalls>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.streams_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockProvider {
    kind: ProviderKind,
    health: MockHealth,
    reply: MockReply,
    chunks: Vec<Result<ProviderChunk, ProviderError>>,
    hang_after_chunks: bool,
    aliases: HashMap<String, String>,
    calls: Arc<MockCalls>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            health: MockHealth::Up(Vec::new()),
            reply: MockReply::Ok {
                content: format!("Hello from {kind}"),
                usage: Some(Usage::new(10, 20)),
            },
            chunks: vec![
                Ok(ProviderChunk::delta("Hel")),
                Ok(ProviderChunk::delta("lo")),
                Ok(ProviderChunk {
                    content_delta: String::new(),
                    done: true,
                    usage: Some(Usage::new(4, 2)),
                }),
            ],
            hang_after_chunks: false,
            aliases: HashMap::new(),
            calls: Arc::new(MockCalls::default()),
        }
    }

    pub fn local() -> Self {
        Self::new(ProviderKind::Local)
    }

    pub fn remote() -> Self {
        Self::new(ProviderKind::Remote)
    }

    pub fn healthy(mut self, models: &[&str]) -> Self {
        self.health = MockHealth::Up(models.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn down(mut self) -> Self {
        self.health = MockHealth::Down;
        self
    }

    pub fn hanging_health(mut self) -> Self {
        self.health = MockHealth::Hang;
        self
    }

    pub fn replying(mut self, content: &str, usage: Option<Usage>) -> Self {
        self.reply = MockReply::Ok {
            content: content.to_string(),
            usage,
        };
        self
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.reply = MockReply::Err(error);
        self
    }

    pub fn streaming(mut self, chunks: Vec<Result<ProviderChunk, ProviderError>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn hang_after_chunks(mut self) -> Self {
        self.hang_after_chunks = true;
        self
    }

    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.insert(from.to_string(), to.to_string());
        self
    }

    pub fn calls(&self) -> Arc<MockCalls> {
        self.calls.clone()
    }
}

impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::Local => "mock-local",
            ProviderKind::Remote => "mock-remote",
        }
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn translate_model(&self, model_id: &str) -> String {
        self.aliases
            .get(model_id)
            .cloned()
            .unwrap_or_else(|| model_id.to_string())
    }

    fn health_check(&self) -> impl Future<Output = Result<Vec<String>, ProviderError>> + Send {
        self.calls.health.fetch_add(1, Ordering::SeqCst);
        let health = self.health.clone();
        async move {
            match health {
                MockHealth::Up(models) => Ok(models),
                MockHealth::Down => Err(ProviderError::Transport("connection refused".into())),
                MockHealth::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn generate(
        &self,
        request: &ProviderRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        self.calls.generate.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_request.lock().unwrap() = Some(request.clone());
        let reply = self.reply.clone();
        let model = request.model.clone();
        async move {
            match reply {
                MockReply::Ok { content, usage } => Ok(ProviderResponse {
                    model,
                    content,
                    usage,
                }),
                MockReply::Err(err) => Err(err),
            }
        }
    }

    fn generate_stream(&self, request: ProviderRequest) -> ChunkStream {
        self.calls.stream.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_request.lock().unwrap() = Some(request);
        let chunks = self.chunks.clone();
        let hang = self.hang_after_chunks;
        let calls = self.calls.clone();
        Box::pin(async_stream::stream! {
            let _guard = DropGuard(calls);
            for chunk in chunks {
                yield chunk;
            }
            if hang {
                std::future::pending::<()>().await;
            }
        })
    }
}

/// Build a provider set, returning the call counters of both mocks.
pub fn provider_set(
    local: MockProvider,
    remote: MockProvider,
) -> (ProviderSet, Arc<MockCalls>, Arc<MockCalls>) {
    let local_calls = local.calls();
    let remote_calls = remote.calls();
    let set = ProviderSet::new(BoxModelProvider::new(local), BoxModelProvider::new(remote));
    (set, local_calls, remote_calls)
}

/// Router over the built-in model table with probe caching disabled.
pub fn test_router(
    local: MockProvider,
    remote: MockProvider,
) -> (RequestRouter, Arc<MockCalls>, Arc<MockCalls>) {
    test_router_with(local, remote, Duration::ZERO)
}

pub fn test_router_with(
    local: MockProvider,
    remote: MockProvider,
    probe_cache_ttl: Duration,
) -> (RequestRouter, Arc<MockCalls>, Arc<MockCalls>) {
    let (set, local_calls, remote_calls) = provider_set(local, remote);
    let prober = HealthProber::new(set.clone(), Duration::from_millis(50), probe_cache_ttl);
    let registry = ModelRegistry::new(default_models()).unwrap();
    let router = RequestRouter::new(
        Arc::new(registry),
        set,
        Arc::new(prober),
        Arc::new(UsageLedger::default()),
    );
    (router, local_calls, remote_calls)
}
