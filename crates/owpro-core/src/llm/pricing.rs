//! Cost estimation for routed requests.
//!
//! Rates come from an ordered pattern table: the first rule whose pattern
//! is a substring of the model id wins, and unmatched models are free.
//! Costs are a coarse family-level approximation, not billing data, and are
//! always displayed with a `~` prefix (`~$0.12`).

use owpro_types::config::{ModelPricing, default_pricing};

/// Rate charged when no pattern matches (local models).
const FALLBACK_COST_PER_THOUSAND: f64 = 0.0;

/// Ordered substring pricing rules.
#[derive(Debug, Clone)]
pub struct PricingTable {
    rules: Vec<ModelPricing>,
}

impl PricingTable {
    pub fn new(rules: Vec<ModelPricing>) -> Self {
        Self { rules }
    }

    /// USD per token for a model id.
    pub fn per_token_rate(&self, model_id: &str) -> f64 {
        self.rules
            .iter()
            .find(|rule| model_id.contains(&rule.pattern))
            .map_or(FALLBACK_COST_PER_THOUSAND, |rule| rule.cost_per_thousand)
            / 1000.0
    }

    /// Estimated USD cost of `total_tokens` on `model_id`.
    pub fn estimate_cost(&self, model_id: &str, total_tokens: u64) -> f64 {
        total_tokens as f64 * self.per_token_rate(model_id)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new(default_pricing())
    }
}

/// Format a cost estimate as a human-readable string.
///
/// - Costs below $0.01 use 4 decimal places: `~$0.0012`
/// - Costs $0.01 and above use 2 decimal places: `~$0.12`
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("~${cost:.4}")
    } else {
        format!("~${cost:.2}")
    }
}
