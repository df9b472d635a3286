//! NDJSON stream reader for Ollama's `/api/chat`.
//!
//! Ollama streams one JSON object per line. Network chunks do not respect
//! line boundaries, so bytes are buffered and split on `\n` before parsing.
//! Reading stops after the first `done: true` object.

use std::time::Duration;

use futures_util::StreamExt;

use owpro_core::llm::provider::ChunkStream;
use owpro_types::llm::{ProviderChunk, ProviderError};

use super::types::{OllamaChatRequest, OllamaChatResponse};
use crate::llm::{map_transport_error, status_error};

/// Open a streaming chat request against Ollama.
///
/// The request is sent on first poll. Dropping the stream drops the
/// response body and closes the connection. `connect_timeout` is only used
/// to label timeout errors; the client enforces it.
pub fn create_ollama_stream(
    client: &reqwest::Client,
    url: &str,
    body: OllamaChatRequest,
    connect_timeout: Duration,
) -> ChunkStream {
    let client = client.clone();
    let url = url.to_string();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, connect_timeout))?;

        if !response.status().is_success() {
            Err::<(), _>(status_error(response).await)?;
            return;
        }

        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'read: while let Some(piece) = bytes.next().await {
            let piece = piece
                .map_err(|e| ProviderError::Stream(format!("response body read: {e}")))?;
            buffer.extend_from_slice(&piece);

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(chunk) = parse_line(&line)? {
                    let done = chunk.done;
                    yield chunk;
                    if done {
                        finished = true;
                        break 'read;
                    }
                }
            }
        }

        // A final object without a trailing newline.
        if !finished {
            if let Some(chunk) = parse_line(&buffer)? {
                yield chunk;
            }
        }
    })
}

/// Parse one NDJSON line. Blank lines yield `None`.
pub(crate) fn parse_line(line: &[u8]) -> Result<Option<ProviderChunk>, ProviderError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }
    let response: OllamaChatResponse = serde_json::from_slice(line)
        .map_err(|e| ProviderError::Deserialization(format!("ollama stream line: {e}")))?;
    response.into_chunk().map(Some)
}
