//! AI gateway endpoints.
//!
//! - `POST /api/v1/ai/process` generate (JSON, or SSE when `stream: true`)
//! - `GET  /api/v1/ai/models`  registry + live availability
//! - `GET  /api/v1/ai/costs`   usage ledger snapshot
//! - `GET  /api/v1/ai/health`  probe both providers
//!
//! SSE event types:
//! - `delta` incremental text: a `StreamEvent` with `done: false`
//! - `done` stream complete: the terminal `StreamEvent`
//! - `error` stream aborted: the terminal `StreamEvent` carrying `error`

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use owpro_core::llm::pricing::format_cost;
use owpro_observe::genai_attrs::{OP_CHAT, span_name};
use owpro_types::llm::{
    GenerationOptions, GenerationRequest, Message, ModelUsage, ProbeResult, StreamEvent,
};

use crate::catalog::{Catalog, model_catalog};
use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

/// Request body for `POST /api/v1/ai/process`.
///
/// Either `prompt` (single user turn) or `messages` must be given; when
/// both are present `messages` wins.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub stream: bool,
    /// Local model to use when the primary cannot be served locally.
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl ProcessRequest {
    pub fn into_generation_request(self) -> Result<GenerationRequest, AppError> {
        if self.model.trim().is_empty() {
            return Err(AppError::Validation("model must not be empty".to_string()));
        }

        let messages = match (self.messages, self.prompt) {
            (Some(messages), _) if !messages.is_empty() => messages,
            (_, Some(prompt)) if !prompt.trim().is_empty() => vec![Message::user(prompt)],
            _ => {
                return Err(AppError::Validation(
                    "either a non-empty prompt or messages is required".to_string(),
                ));
            }
        };

        Ok(GenerationRequest {
            model_id: self.model,
            messages,
            stream: self.stream,
            fallback_model_id: self.fallback.filter(|f| !f.trim().is_empty()),
            options: self.options,
        })
    }
}

/// POST /api/v1/ai/process
pub async fn process(
    State(state): State<AppState>,
    Json(body): Json<ProcessRequest>,
) -> Result<Response, AppError> {
    let meta = RequestMeta::start();
    let request = body.into_generation_request()?;

    let span = tracing::info_span!(
        "ai.process",
        otel.name = %span_name(OP_CHAT, &request.model_id),
        gen_ai.operation.name = OP_CHAT,
        request_id = %meta.request_id,
        stream = request.stream,
    );

    if request.stream {
        let events = state
            .router
            .stream_route(&request)
            .instrument(span)
            .await?;
        return Ok(sse_response(events).into_response());
    }

    let result = state.router.route(&request).instrument(span).await?;
    Ok(ApiResponse::success(result, meta).into_response())
}

/// Wrap a router event stream as SSE.
fn sse_response(
    events: owpro_core::llm::stream::EventStream,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let stream = events.map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn sse_event(event: &StreamEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event_name(event)).data(data)
}

fn event_name(event: &StreamEvent) -> &'static str {
    if event.is_error() {
        "error"
    } else if event.done {
        "done"
    } else {
        "delta"
    }
}

/// GET /api/v1/ai/models
pub async fn models(State(state): State<AppState>) -> ApiResponse<Catalog> {
    let meta = RequestMeta::start();
    let catalog = model_catalog(&state.router).await;
    ApiResponse::success(catalog, meta)
}

/// Ledger snapshot returned by `GET /api/v1/ai/costs`.
#[derive(Debug, Serialize)]
pub struct CostReport {
    pub models: BTreeMap<String, ModelUsage>,
    pub total_cost: f64,
    /// Approximate, e.g. `~$0.0042`.
    pub total_cost_display: String,
}

impl CostReport {
    pub fn from_state(state: &AppState) -> Self {
        let ledger = state.router.ledger();
        let total_cost = ledger.total_cost();
        Self {
            models: ledger.snapshot(),
            total_cost,
            total_cost_display: format_cost(total_cost),
        }
    }
}

/// GET /api/v1/ai/costs
pub async fn costs(State(state): State<AppState>) -> ApiResponse<CostReport> {
    ApiResponse::success(CostReport::from_state(&state), RequestMeta::start())
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// At least one provider is reachable.
    pub healthy: bool,
    pub providers: Vec<ProbeResult>,
}

/// GET /api/v1/ai/health
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthReport> {
    let meta = RequestMeta::start();
    let providers = state.router.prober().probe_all().await;
    let healthy = providers.iter().any(|p| p.available);
    ApiResponse::success(HealthReport { healthy, providers }, meta)
}
