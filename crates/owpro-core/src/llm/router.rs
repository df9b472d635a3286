//! Request router: local-first model selection with remote fallback.
//!
//! Routing is an explicit state machine:
//!
//! ```text
//! ResolveModel -> ProbeLocal -> DispatchLocal | DispatchFallback | DispatchRemote -> Normalize
//! ```
//!
//! - A local model goes to the local provider whenever the probe says it is
//!   up, even if its listing omits the model (that only earns a warning, and
//!   a missing model surfaces as the local provider's own error). When the
//!   local provider is down the request goes remote, with the remote adapter
//!   translating the model id.
//! - A remote model goes straight to the remote provider. It is diverted to
//!   the local provider only when an explicit local fallback is given and
//!   the local provider is up.
//! - There are no retries. A failed dispatch on the direct path surfaces as
//!   `RouteError::Provider`; a failed dispatch after the local provider was
//!   skipped surfaces as `RouteError::AllProvidersExhausted`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use owpro_types::llm::{
    FailedAttempt, GenerationRequest, GenerationResult, ModelDescriptor, ProbeResult,
    ProviderError, ProviderKind, ProviderRequest, ProviderResponse, RouteError, RouteKind,
};
use tracing::{Instrument, info_span};

use super::box_provider::ProviderSet;
use super::health::HealthProber;
use super::ledger::UsageLedger;
use super::registry::ModelRegistry;
use super::token_budget::TokenBudget;

/// Named states of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    ResolveModel,
    ProbeLocal,
    DispatchLocal,
    DispatchFallback,
    DispatchRemote,
    Normalize,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteState::ResolveModel => "resolve_model",
            RouteState::ProbeLocal => "probe_local",
            RouteState::DispatchLocal => "dispatch_local",
            RouteState::DispatchFallback => "dispatch_fallback",
            RouteState::DispatchRemote => "dispatch_remote",
            RouteState::Normalize => "normalize",
        };
        f.write_str(name)
    }
}

impl RouteState {
    /// Transition to the next state given what is known so far.
    ///
    /// `ProbeLocal` expects `ctx.local_probe` to be filled in.
    pub fn next(self, ctx: &RouteContext<'_>) -> RouteState {
        match self {
            RouteState::ResolveModel if ctx.needs_local_probe() => RouteState::ProbeLocal,
            RouteState::ResolveModel => RouteState::DispatchRemote,
            RouteState::ProbeLocal if ctx.local_healthy_for(ctx.primary) => RouteState::DispatchLocal,
            RouteState::ProbeLocal if ctx.fallback.is_some_and(|f| ctx.local_healthy_for(f)) => {
                RouteState::DispatchFallback
            }
            RouteState::ProbeLocal => RouteState::DispatchRemote,
            RouteState::DispatchLocal
            | RouteState::DispatchFallback
            | RouteState::DispatchRemote
            | RouteState::Normalize => RouteState::Normalize,
        }
    }
}

/// Resolved models plus the local probe, once taken.
#[derive(Debug, Clone)]
pub struct RouteContext<'a> {
    pub primary: &'a ModelDescriptor,
    pub fallback: Option<&'a ModelDescriptor>,
    pub local_probe: Option<ProbeResult>,
}

impl<'a> RouteContext<'a> {
    pub fn new(primary: &'a ModelDescriptor, fallback: Option<&'a ModelDescriptor>) -> Self {
        Self {
            primary,
            fallback,
            local_probe: None,
        }
    }

    fn needs_local_probe(&self) -> bool {
        self.primary.provider_kind == ProviderKind::Local
            || self
                .fallback
                .is_some_and(|f| f.provider_kind == ProviderKind::Local)
    }

    /// A local-kind model goes to the local provider whenever the probe
    /// says it is up. The model listing is advisory only.
    fn local_healthy_for(&self, model: &ModelDescriptor) -> bool {
        model.provider_kind == ProviderKind::Local
            && self.local_probe.as_ref().is_some_and(|probe| probe.available)
    }

    /// Whether the local listing omits `model` while the provider is up.
    pub fn unlisted_locally(&self, model: &ModelDescriptor) -> bool {
        self.local_probe
            .as_ref()
            .is_some_and(|probe| probe.available && !probe.serves(&model.id))
    }

    /// Why the local provider could not take a model.
    fn unavailable_reason(&self) -> String {
        let unavailable = RouteError::ProviderUnavailable {
            provider: ProviderKind::Local,
        };
        match self.local_probe.as_ref().and_then(|p| p.error.as_ref()) {
            Some(err) => format!("{unavailable}: {err}"),
            None => unavailable.to_string(),
        }
    }

    /// Local models that were passed over on the way to `target`.
    ///
    /// Non-empty only when the primary model is local, i.e. when the
    /// dispatch is degraded.
    fn skipped(&self, target: RouteState) -> Vec<FailedAttempt> {
        if self.primary.provider_kind != ProviderKind::Local {
            return Vec::new();
        }
        let mut skipped = vec![FailedAttempt {
            provider: ProviderKind::Local,
            model_id: self.primary.id.clone(),
            reason: self.unavailable_reason(),
        }];
        if target == RouteState::DispatchRemote {
            if let Some(fallback) = self
                .fallback
                .filter(|f| f.provider_kind == ProviderKind::Local)
            {
                skipped.push(FailedAttempt {
                    provider: ProviderKind::Local,
                    model_id: fallback.id.clone(),
                    reason: self.unavailable_reason(),
                });
            }
        }
        skipped
    }
}

/// Outcome of selection: which provider gets which request.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Logical model served (the fallback id when the fallback fired).
    pub model_id: String,
    pub provider: ProviderKind,
    pub route: RouteKind,
    /// Provider-native request, limits already applied.
    pub request: ProviderRequest,
    /// Local attempts passed over before this selection.
    pub skipped: Vec<FailedAttempt>,
}

impl Selection {
    pub fn is_degraded(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Turn a dispatch failure into the error the caller sees.
    pub fn failure(&self, err: ProviderError) -> RouteError {
        if !self.is_degraded() {
            return RouteError::Provider {
                provider: self.provider,
                source: err,
            };
        }
        let mut attempts = self.skipped.clone();
        attempts.push(FailedAttempt {
            provider: self.provider,
            model_id: self.request.model.clone(),
            reason: err.to_string(),
        });
        RouteError::AllProvidersExhausted { attempts }
    }
}

/// Wrap a native response into the uniform result.
///
/// Missing usage becomes zero with `usage_reported: false`.
pub fn normalize(
    selection: &Selection,
    response: ProviderResponse,
    elapsed: Duration,
) -> GenerationResult {
    GenerationResult {
        model_id: selection.model_id.clone(),
        provider: selection.provider,
        provider_model: selection.request.model.clone(),
        content: response.content,
        usage_reported: response.usage.is_some(),
        usage: response.usage.unwrap_or_default(),
        latency_ms: elapsed.as_millis() as u64,
        route: selection.route,
    }
}

/// Routes generation requests across the local and remote providers.
pub struct RequestRouter {
    registry: Arc<ModelRegistry>,
    providers: ProviderSet,
    prober: Arc<HealthProber>,
    ledger: Arc<UsageLedger>,
}

impl RequestRouter {
    pub fn new(
        registry: Arc<ModelRegistry>,
        providers: ProviderSet,
        prober: Arc<HealthProber>,
        ledger: Arc<UsageLedger>,
    ) -> Self {
        Self {
            registry,
            providers,
            prober,
            ledger,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn prober(&self) -> &Arc<HealthProber> {
        &self.prober
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub(crate) fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Route a non-streaming request and record its usage.
    pub async fn route(&self, request: &GenerationRequest) -> Result<GenerationResult, RouteError> {
        let start = Instant::now();
        let mut selection = self.select(request).await?;
        selection.request.stream = false;

        let provider = self.providers.get(selection.provider);
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.provider.name = provider.name(),
            gen_ai.request.model = %selection.request.model,
            gen_ai.request.max_tokens = selection.request.max_tokens,
            gen_ai.request.temperature = selection.request.temperature,
            gen_ai.request.stream = false,
            route = %selection.route,
        );

        let response = match provider.generate(&selection.request).instrument(span).await {
            Ok(response) => response,
            Err(err) => return Err(self.dispatch_failed(&selection, err)),
        };

        let result = normalize(&selection, response, start.elapsed());
        self.ledger.record(&result.provider_model, result.usage);

        tracing::info!(
            model = %result.model_id,
            provider = %result.provider,
            route = %result.route,
            total_tokens = result.usage.total_tokens,
            usage_reported = result.usage_reported,
            latency_ms = result.latency_ms,
            "Request completed"
        );
        Ok(result)
    }

    /// Run the selection states: resolve, probe, pick a dispatch target.
    ///
    /// Fails with `ModelNotFound`, `ContextLengthExceeded` or
    /// `InvalidRequest` before any provider is contacted.
    pub async fn select(&self, request: &GenerationRequest) -> Result<Selection, RouteError> {
        let (primary, fallback) = self.resolve(request)?;
        let mut ctx = RouteContext::new(primary, fallback);

        let mut state = RouteState::ResolveModel.next(&ctx);
        tracing::debug!(from = %RouteState::ResolveModel, to = %state, "Route transition");

        if state == RouteState::ProbeLocal {
            ctx.local_probe = Some(self.prober.probe(ProviderKind::Local).await);
            let next = state.next(&ctx);
            tracing::debug!(from = %state, to = %next, "Route transition");
            state = next;
        }

        let listed_check = match state {
            RouteState::DispatchLocal => Some(primary),
            RouteState::DispatchFallback => fallback,
            _ => None,
        };
        if let Some(model) = listed_check.filter(|m| ctx.unlisted_locally(m)) {
            tracing::warn!(
                model = %model.id,
                "Local provider does not list the model, dispatching locally anyway"
            );
        }

        let selection = match (state, fallback) {
            (RouteState::DispatchLocal, _) => {
                self.selection(request, primary, ProviderKind::Local, RouteKind::Local, Vec::new())
            }
            (RouteState::DispatchFallback, Some(fallback)) => self.selection(
                request,
                fallback,
                ProviderKind::Local,
                RouteKind::Fallback,
                ctx.skipped(state),
            ),
            _ => self.selection(
                request,
                primary,
                ProviderKind::Remote,
                RouteKind::Remote,
                ctx.skipped(RouteState::DispatchRemote),
            ),
        };

        if selection.is_degraded() {
            tracing::warn!(
                requested = %primary.id,
                model = %selection.model_id,
                provider = %selection.provider,
                skipped = selection.skipped.len(),
                "Local provider cannot serve requested model, falling back"
            );
        }
        tracing::info!(
            model = %selection.model_id,
            provider = %selection.provider,
            provider_model = %selection.request.model,
            route = %selection.route,
            "Route selected"
        );
        Ok(selection)
    }

    /// Log a dispatch failure, drop stale probe data, and map the error.
    pub(crate) fn dispatch_failed(&self, selection: &Selection, err: ProviderError) -> RouteError {
        fail_dispatch(&self.prober, selection, err)
    }

    fn resolve(
        &self,
        request: &GenerationRequest,
    ) -> Result<(&ModelDescriptor, Option<&ModelDescriptor>), RouteError> {
        let primary = self.registry.lookup(&request.model_id)?;
        let fallback = request
            .fallback_model_id
            .as_deref()
            .map(|id| self.registry.lookup(id))
            .transpose()?;

        if request.messages.is_empty() {
            return Err(RouteError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }
        TokenBudget::from_descriptor(primary).check_prompt(&primary.id, &request.messages)?;

        Ok((primary, fallback))
    }

    fn selection(
        &self,
        request: &GenerationRequest,
        model: &ModelDescriptor,
        provider: ProviderKind,
        route: RouteKind,
        skipped: Vec<FailedAttempt>,
    ) -> Selection {
        let budget = TokenBudget::from_descriptor(model).with_options(&request.options);
        let provider_model = self.providers.get(provider).translate_model(&model.id);
        Selection {
            model_id: model.id.clone(),
            provider,
            route,
            request: ProviderRequest {
                model: provider_model,
                messages: request.messages.clone(),
                max_tokens: budget.max_tokens,
                temperature: budget.temperature,
                stream: request.stream,
            },
            skipped,
        }
    }
}

pub(crate) fn fail_dispatch(
    prober: &HealthProber,
    selection: &Selection,
    err: ProviderError,
) -> RouteError {
    if err.is_connectivity() {
        prober.invalidate(selection.provider);
    }
    tracing::error!(
        provider = %selection.provider,
        model = %selection.request.model,
        error = %err,
        "Provider dispatch failed"
    );
    selection.failure(err)
}
