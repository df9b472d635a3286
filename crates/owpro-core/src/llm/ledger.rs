//! Process-wide usage and cost accounting.
//!
//! `UsageLedger` accumulates token counts and an estimated cost per model
//! id. It is injected as `Arc<UsageLedger>` wherever usage is recorded, so
//! every test can own an isolated instance. Updates go through the
//! `DashMap` entry API, whose per-shard lock serializes increments on the
//! same key. Reads clone values so no guard outlives the call.

use std::collections::BTreeMap;

use dashmap::DashMap;
use owpro_types::llm::{ModelUsage, Usage};

use super::pricing::PricingTable;

/// Concurrent accumulator of usage per model id.
#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: DashMap<String, ModelUsage>,
    pricing: PricingTable,
}

impl UsageLedger {
    pub fn new(pricing: PricingTable) -> Self {
        Self {
            entries: DashMap::new(),
            pricing,
        }
    }

    /// Add one completed request's usage to the model's totals.
    pub fn record(&self, model_id: &str, usage: Usage) {
        let total = u64::from(usage.total_tokens);
        let cost = self.pricing.estimate_cost(model_id, total);

        let mut entry = self.entries.entry(model_id.to_string()).or_default();
        entry.prompt_tokens += u64::from(usage.prompt_tokens);
        entry.completion_tokens += u64::from(usage.completion_tokens);
        entry.total_tokens += total;
        entry.requests += 1;
        entry.estimated_cost += cost;
        drop(entry);

        tracing::debug!(
            model = model_id,
            total_tokens = total,
            estimated_cost = cost,
            "Usage recorded"
        );
    }

    /// Accumulated usage for one model, if it has served any request.
    pub fn get(&self, model_id: &str) -> Option<ModelUsage> {
        self.entries.get(model_id).map(|r| r.value().clone())
    }

    /// All accumulated usage, ordered by model id.
    pub fn snapshot(&self) -> BTreeMap<String, ModelUsage> {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Sum of estimated cost over all models.
    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|r| r.value().estimated_cost).sum()
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn record_accumulates_tokens_and_cost() {
        let ledger = UsageLedger::default();
        ledger.record("gpt-4", Usage::new(400, 600));
        ledger.record("gpt-4", Usage::new(0, 1000));

        let usage = ledger.get("gpt-4").unwrap();
        assert_eq!(usage.prompt_tokens, 400);
        assert_eq!(usage.completion_tokens, 1600);
        assert_eq!(usage.total_tokens, 2000);
        assert_eq!(usage.requests, 2);
        assert!((usage.estimated_cost - 0.06).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_has_no_entry() {
        let ledger = UsageLedger::default();
        assert!(ledger.get("llama2").is_none());
        assert!(ledger.snapshot().is_empty());
    }

    #[test]
    fn zero_usage_still_counts_request() {
        let ledger = UsageLedger::default();
        ledger.record("llama2", Usage::default());
        let usage = ledger.get("llama2").unwrap();
        assert_eq!(usage.requests, 1);
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(usage.estimated_cost, 0.0);
    }

    #[test]
    fn snapshot_is_sorted_by_model() {
        let ledger = UsageLedger::default();
        ledger.record("mistral", Usage::new(1, 1));
        ledger.record("gpt-3.5-turbo", Usage::new(500, 500));
        ledger.record("llama2", Usage::new(2, 2));

        let snapshot = ledger.snapshot();
        let ids: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["gpt-3.5-turbo", "llama2", "mistral"]);
        assert!((ledger.total_cost() - 0.002).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_have_no_lost_updates() {
        let ledger = Arc::new(UsageLedger::default());
        let mut handles = Vec::new();

        for i in 0..100u32 {
            let ledger = ledger.clone();
            let model = if i % 2 == 0 { "gpt-4" } else { "llama2" };
            handles.push(tokio::spawn(async move {
                ledger.record(model, Usage::new(i, 1));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let gpt4 = ledger.get("gpt-4").unwrap();
        let llama = ledger.get("llama2").unwrap();
        assert_eq!(gpt4.requests, 50);
        assert_eq!(llama.requests, 50);

        let even: u64 = (0..100u64).filter(|i| i % 2 == 0).sum();
        let odd: u64 = (0..100u64).filter(|i| i % 2 == 1).sum();
        assert_eq!(gpt4.prompt_tokens, even);
        assert_eq!(llama.prompt_tokens, odd);
        assert_eq!(gpt4.total_tokens + llama.total_tokens, even + odd + 100);
    }
}
