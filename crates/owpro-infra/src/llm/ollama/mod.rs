//! Ollama local inference provider.
//!
//! This module provides the [`OllamaProvider`] which implements the
//! [`ModelProvider`](owpro_core::llm::provider::ModelProvider) trait for the
//! native Ollama API, including NDJSON streaming.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::OllamaProvider;
