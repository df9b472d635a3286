//! Provider health probing.
//!
//! A probe asks a provider for its model listing within a bounded time.
//! Results are cached per provider kind for a short TTL so that bursts of
//! routing decisions do not hammer the liveness endpoint. Probing never
//! fails: every problem is folded into an unavailable [`ProbeResult`].

use std::time::{Duration, Instant};

use dashmap::DashMap;
use owpro_types::config::ProbeConfig;
use owpro_types::llm::{ProbeResult, ProviderKind};

use super::box_provider::ProviderSet;

#[derive(Debug, Clone)]
struct CachedProbe {
    result: ProbeResult,
    probed_at: Instant,
}

/// Bounded, cached liveness checks for both provider kinds.
pub struct HealthProber {
    providers: ProviderSet,
    timeout: Duration,
    cache_ttl: Duration,
    cache: DashMap<ProviderKind, CachedProbe>,
}

impl HealthProber {
    pub fn new(providers: ProviderSet, timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            providers,
            timeout,
            cache_ttl,
            cache: DashMap::new(),
        }
    }

    pub fn from_config(providers: ProviderSet, config: &ProbeConfig) -> Self {
        Self::new(
            providers,
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.cache_ttl_ms),
        )
    }

    /// Probe a provider, reusing a fresh cached result when there is one.
    pub async fn probe(&self, kind: ProviderKind) -> ProbeResult {
        if let Some(cached) = self.cached(kind) {
            return cached;
        }

        let result = self.probe_uncached(kind).await;
        if !self.cache_ttl.is_zero() {
            self.cache.insert(
                kind,
                CachedProbe {
                    result: result.clone(),
                    probed_at: Instant::now(),
                },
            );
        }
        result
    }

    /// Probe both providers concurrently.
    pub async fn probe_all(&self) -> Vec<ProbeResult> {
        let (local, remote) = futures_util::join!(
            self.probe(ProviderKind::Local),
            self.probe(ProviderKind::Remote)
        );
        vec![local, remote]
    }

    /// Forget the cached result for a provider.
    ///
    /// Called when a dispatch hits a transport failure, so the next routing
    /// decision sees the outage instead of a stale "available".
    pub fn invalidate(&self, kind: ProviderKind) {
        if self.cache.remove(&kind).is_some() {
            tracing::debug!(provider = %kind, "Probe cache invalidated");
        }
    }

    fn cached(&self, kind: ProviderKind) -> Option<ProbeResult> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let entry = self.cache.get(&kind)?;
        (entry.probed_at.elapsed() < self.cache_ttl).then(|| entry.result.clone())
    }

    async fn probe_uncached(&self, kind: ProviderKind) -> ProbeResult {
        let provider = self.providers.get(kind);
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, provider.health_check()).await {
            Ok(Ok(models)) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(
                    provider = %kind,
                    name = provider.name(),
                    models = models.len(),
                    latency_ms,
                    "Provider reachable"
                );
                ProbeResult {
                    provider: kind,
                    available: true,
                    known_model_ids: models,
                    latency_ms: Some(latency_ms),
                    error: None,
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(provider = %kind, error = %err, "Provider probe failed");
                ProbeResult::unavailable(kind, err.to_string())
            }
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                tracing::warn!(provider = %kind, timeout_ms, "Provider probe timed out");
                ProbeResult::unavailable(kind, format!("probe timed out after {timeout_ms}ms"))
            }
        }
    }
}
