//! Observability for the gateway: tracing subscriber setup and the GenAI
//! semantic-convention names shared by the adapters and the HTTP layer.

pub mod genai_attrs;
pub mod tracing_setup;
