//! Streaming adapter: provider chunks to uniform `StreamEvent`s.
//!
//! Selection runs once, before the first event. After that every provider
//! chunk becomes exactly one event, and the session always ends with a
//! single `done: true` event:
//!
//! - the provider's own final chunk,
//! - a synthetic empty event if the transport closes without one, or
//! - an error-flagged event if the provider fails mid-stream.
//!
//! Usage is recorded before a clean terminal event is yielded, so a consumer
//! that stops reading right after `done` still gets accounted. Dropping the
//! event stream drops the provider stream and its connection.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use owpro_types::llm::{GenerationRequest, RouteError, StreamEvent};

use super::health::HealthProber;
use super::ledger::UsageLedger;
use super::provider::ChunkStream;
use super::router::{RequestRouter, Selection, fail_dispatch};

/// Boxed stream of routed events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'static>>;

impl RequestRouter {
    /// Select a provider and open a streaming session.
    ///
    /// Selection errors (unknown model, oversized prompt) are returned
    /// directly; once the stream exists every failure arrives as an event.
    pub async fn stream_route(
        &self,
        request: &GenerationRequest,
    ) -> Result<EventStream, RouteError> {
        let start = Instant::now();
        let mut selection = self.select(request).await?;
        selection.request.stream = true;

        let provider = self.providers().get(selection.provider);
        tracing::info!(
            gen_ai.provider.name = provider.name(),
            gen_ai.request.model = %selection.request.model,
            gen_ai.request.max_tokens = selection.request.max_tokens,
            gen_ai.request.stream = true,
            route = %selection.route,
            "Opening stream"
        );
        let chunks = provider.generate_stream(selection.request.clone());

        Ok(Box::pin(session(
            chunks,
            selection,
            self.ledger().clone(),
            self.prober().clone(),
            start,
        )))
    }
}

fn event(
    model_id: &str,
    start: Instant,
    delta: String,
    done: bool,
    error: Option<String>,
) -> StreamEvent {
    StreamEvent {
        model_id: model_id.to_string(),
        content_delta: delta,
        done,
        latency_ms_so_far: start.elapsed().as_millis() as u64,
        error,
    }
}

fn session(
    mut chunks: ChunkStream,
    selection: Selection,
    ledger: Arc<UsageLedger>,
    prober: Arc<HealthProber>,
    start: Instant,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let model_id = selection.model_id.clone();
        let mut usage = None;
        let mut events = 0u64;

        loop {
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    events += 1;
                    if chunk.done {
                        ledger.record(&selection.request.model, usage.unwrap_or_default());
                        yield event(&model_id, start, chunk.content_delta, true, None);
                        break;
                    }
                    yield event(&model_id, start, chunk.content_delta, false, None);
                }
                Some(Err(err)) => {
                    let error = fail_dispatch(&prober, &selection, err);
                    tracing::warn!(model = %model_id, events, "Stream aborted");
                    yield event(&model_id, start, String::new(), true, Some(error.to_string()));
                    return;
                }
                None => {
                    tracing::debug!(model = %model_id, "Provider stream closed without a final chunk");
                    ledger.record(&selection.request.model, usage.unwrap_or_default());
                    yield event(&model_id, start, String::new(), true, None);
                    break;
                }
            }
        }

        tracing::info!(
            model = %model_id,
            route = %selection.route,
            events,
            usage_reported = usage.is_some(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Stream completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use owpro_types::llm::{ProviderChunk, ProviderError, Usage};

    use super::*;
    use crate::llm::test_support::{MockProvider, test_router};

    async fn collect(stream: EventStream) -> Vec<StreamEvent> {
        stream.collect().await
    }

    fn request(model: &str) -> GenerationRequest {
        let mut request = GenerationRequest::from_prompt(model, "hi");
        request.stream = true;
        request
    }

    #[tokio::test]
    async fn test_chunks_map_one_to_one_in_order() {
        let (router, local, _) = test_router(MockProvider::local(), MockProvider::remote());

        let events = collect(router.stream_route(&request("llama2")).await.unwrap()).await;

        let deltas: Vec<&str> = events.iter().map(|e| e.content_delta.as_str()).collect();
        assert_eq!(deltas, vec!["Hel", "lo", ""]);
        assert_eq!(events.iter().filter(|e| e.done).count(), 1);
        assert!(events.last().unwrap().done);
        assert!(events.iter().all(|e| e.model_id == "llama2" && !e.is_error()));
        assert!(local.last_request().unwrap().stream);

        let usage = router.ledger().get("llama2").unwrap();
        assert_eq!(usage.total_tokens, 6);
        assert_eq!(usage.requests, 1);
    }

    #[tokio::test]
    async fn test_synthetic_done_when_transport_closes() {
        let (router, _, _) = test_router(
            MockProvider::local().streaming(vec![
                Ok(ProviderChunk::delta("a")),
                Ok(ProviderChunk::delta("b")),
            ]),
            MockProvider::remote(),
        );

        let events = collect(router.stream_route(&request("llama2")).await.unwrap()).await;

        assert_eq!(events.len(), 3);
        let last = events.last().unwrap();
        assert!(last.done);
        assert!(last.content_delta.is_empty());
        assert!(!last.is_error());
        assert_eq!(router.ledger().get("llama2").unwrap().total_tokens, 0);
    }

    #[tokio::test]
    async fn test_mid_stream_error_ends_with_error_event() {
        let (router, _, _) = test_router(
            MockProvider::local().streaming(vec![
                Ok(ProviderChunk::delta("partial")),
                Err(ProviderError::Stream("connection reset".into())),
                Ok(ProviderChunk::delta("never")),
            ]),
            MockProvider::remote(),
        );

        let events = collect(router.stream_route(&request("llama2")).await.unwrap()).await;

        assert_eq!(events.len(), 2);
        assert!(!events[0].done);
        let last = &events[1];
        assert!(last.done);
        assert!(last.error.as_deref().unwrap().contains("connection reset"));
        assert!(router.ledger().get("llama2").is_none());
    }

    #[tokio::test]
    async fn test_chunks_after_done_are_ignored() {
        let (router, _, _) = test_router(
            MockProvider::local().streaming(vec![
                Ok(ProviderChunk::finished(Some(Usage::new(1, 1)))),
                Ok(ProviderChunk::delta("late")),
            ]),
            MockProvider::remote(),
        );

        let events = collect(router.stream_route(&request("llama2")).await.unwrap()).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].done);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_provider_stream() {
        let (router, local, _) = test_router(
            MockProvider::local()
                .streaming(vec![Ok(ProviderChunk::delta("first"))])
                .hang_after_chunks(),
            MockProvider::remote(),
        );

        let mut stream = router.stream_route(&request("llama2")).await.unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.content_delta, "first");
        assert_eq!(local.streams_dropped(), 0);

        drop(stream);
        assert_eq!(local.streams_dropped(), 1);
        assert!(router.ledger().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_selection_errors_returned_before_stream() {
        let (router, local, remote) = test_router(MockProvider::local(), MockProvider::remote());
        let err = router.stream_route(&request("nope")).await.err().unwrap();
        assert!(matches!(err, RouteError::ModelNotFound { .. }));
        assert_eq!(local.stream() + remote.stream(), 0);
    }

    #[tokio::test]
    async fn test_fallback_stream_reports_fallback_model() {
        let (router, _, remote) = test_router(
            MockProvider::local().healthy(&["mistral:latest"]),
            MockProvider::remote(),
        );

        let request = request("gpt-4").with_fallback("mistral");
        let events = collect(router.stream_route(&request).await.unwrap()).await;
        assert!(events.iter().all(|e| e.model_id == "mistral"));
        assert_eq!(remote.stream(), 0);
    }

    #[tokio::test]
    async fn test_degraded_stream_failure_lists_attempts() {
        let (router, _, _) = test_router(
            MockProvider::local().down(),
            MockProvider::remote().streaming(vec![Err(ProviderError::Status {
                status: 503,
                body: "overloaded".into(),
            })]),
        );

        let events = collect(router.stream_route(&request("llama2")).await.unwrap()).await;
        assert_eq!(events.len(), 1);
        let error = events[0].error.as_deref().unwrap();
        assert!(error.contains("all providers exhausted"));
        assert!(error.contains("HTTP 503"));
    }
}
