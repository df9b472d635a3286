//! Infrastructure layer for the OpenWebUI Pro AI gateway.
//!
//! Contains the concrete provider adapters for the
//! [`ModelProvider`](owpro_core::llm::provider::ModelProvider) trait defined
//! in `owpro-core` (Ollama over `reqwest`, OpenAI over `async-openai`) and
//! the `config.toml` + environment loader.

pub mod config;
pub mod llm;
