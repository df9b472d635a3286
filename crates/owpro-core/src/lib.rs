//! Routing core for the OpenWebUI Pro AI gateway.
//!
//! This crate defines the provider "port" (`ModelProvider`) that the
//! infrastructure layer implements, and everything that sits between an
//! inbound generation request and a provider call. It depends only on
//! `owpro-types`, never on `owpro-infra` or any HTTP client.

pub mod llm;
