//! OpenAI SSE stream to [`ProviderChunk`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] events to the
//! provider-agnostic chunks the router consumes.
//!
//! With `stream_options.include_usage` set, OpenAI sends the token counts in
//! a trailing chunk with an empty `choices` array, after the chunk carrying
//! `finish_reason`. The terminal chunk is therefore emitted only once the
//! SSE stream ends, so it carries the usage.

use futures_util::StreamExt;

use async_openai::types::chat::{ChatCompletionResponseStream, CompletionUsage};

use owpro_core::llm::provider::ChunkStream;
use owpro_types::llm::{ProviderChunk, ProviderError, Usage};

/// Map an async-openai [`ChatCompletionResponseStream`] to a [`ChunkStream`].
///
/// Emits one delta per non-empty content fragment, then a single terminal
/// chunk if a finish reason or usage was seen. A stream that ends without
/// either yields no terminal chunk.
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        let mut usage: Option<Usage> = None;
        let mut finished = false;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| ProviderError::Stream(e.to_string()))?;

            if let Some(reported) = chunk.usage.as_ref() {
                usage = Some(map_usage(reported));
            }

            for choice in &chunk.choices {
                let text = choice.delta.content.as_deref().unwrap_or_default();
                if !text.is_empty() {
                    yield ProviderChunk::delta(text);
                }
                if choice.finish_reason.is_some() {
                    finished = true;
                }
            }
        }

        if finished || usage.is_some() {
            yield ProviderChunk::finished(usage);
        }
    })
}

pub(crate) fn map_usage(usage: &CompletionUsage) -> Usage {
    Usage::new(usage.prompt_tokens, usage.completion_tokens)
}
