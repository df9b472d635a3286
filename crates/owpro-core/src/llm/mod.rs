//! Model routing for the gateway.
//!
//! - `ModelProvider`: RPITIT trait for concrete provider adapters
//! - `BoxModelProvider` / `ProviderSet`: object-safe wrappers the router holds
//! - `ModelRegistry`: static model table
//! - `HealthProber`: bounded, cached liveness checks
//! - `RequestRouter`: local-first selection, dispatch and normalization,
//!   plus the streaming adapter
//! - `UsageLedger` / `PricingTable`: usage and approximate cost accounting

pub mod box_provider;
pub mod health;
pub mod ledger;
pub mod pricing;
pub mod provider;
pub mod registry;
pub mod router;
pub mod stream;
pub mod token_budget;

#[cfg(test)]
pub(crate) mod test_support;
