//! HTTP/REST API layer for the gateway.
//!
//! Axum-based REST API at `/api/v1/ai/` with envelope response format, SSE
//! streaming, and CORS for the frontend origin.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
