//! Per-model token limits applied before dispatch.
//!
//! Prompt size is estimated at roughly four characters per token. That is
//! coarse but enough to reject prompts that cannot possibly fit the model's
//! context window before any provider is contacted.

use owpro_types::llm::{GenerationOptions, Message, ModelDescriptor, RouteError};

/// Approximate characters per token for English text.
const CHARS_PER_TOKEN: usize = 4;

/// Upper bound accepted by both provider APIs.
const MAX_TEMPERATURE: f64 = 2.0;

/// Estimate the prompt token count of a conversation.
pub fn estimate_prompt_tokens(messages: &[Message]) -> u32 {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Resolved limits for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBudget {
    pub context_window: u32,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl TokenBudget {
    pub fn from_descriptor(model: &ModelDescriptor) -> Self {
        Self {
            context_window: model.context_window,
            max_tokens: model.max_tokens,
            temperature: model.temperature,
        }
    }

    /// Reject prompts whose estimated size exceeds the context window.
    ///
    /// Returns the estimate on success.
    pub fn check_prompt(&self, model_id: &str, messages: &[Message]) -> Result<u32, RouteError> {
        let requested = estimate_prompt_tokens(messages);
        if requested > self.context_window {
            return Err(RouteError::ContextLengthExceeded {
                model_id: model_id.to_string(),
                max: self.context_window,
                requested,
            });
        }
        Ok(requested)
    }

    /// Apply per-request overrides.
    ///
    /// `max_tokens` never exceeds the model's limit; temperature is kept
    /// within `[0, 2]`.
    pub fn with_options(&self, options: &GenerationOptions) -> Self {
        let max_tokens = options
            .max_tokens
            .map_or(self.max_tokens, |requested| requested.min(self.max_tokens));
        let temperature = options
            .temperature
            .map_or(self.temperature, |t| t.clamp(0.0, MAX_TEMPERATURE));
        Self {
            max_tokens,
            temperature,
            ..*self
        }
    }
}
