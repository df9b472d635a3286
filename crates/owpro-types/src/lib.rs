//! Shared domain types for the OpenWebUI Pro AI gateway.
//!
//! Model descriptors, generation requests/results, streaming events, usage
//! accounting, the router/provider error taxonomy and configuration types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod llm;
