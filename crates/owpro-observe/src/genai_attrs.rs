//! OpenTelemetry GenAI Semantic Convention values.
//!
//! Span field names themselves (`gen_ai.provider.name`,
//! `gen_ai.request.model`, `gen_ai.usage.input_tokens`, ...) are written
//! inline in the `info_span!` calls, since tracing field names must be
//! literals. The values below are shared between crates.
//!
//! Span naming convention: `"{operation} {model}"` (e.g., `"chat llama2"`)

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Local Ollama provider identifier.
pub const PROVIDER_OLLAMA: &str = "ollama";

/// Remote OpenAI provider identifier.
pub const PROVIDER_OPENAI: &str = "openai";

/// Span name for an operation on a model.
pub fn span_name(operation: &str, model: &str) -> String {
    format!("{operation} {model}")
}
