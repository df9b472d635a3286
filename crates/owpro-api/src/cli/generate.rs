//! `owpro generate`: route one prompt through the gateway.

use std::io::Write;

use anyhow::{Result, bail};
use console::style;
use futures_util::StreamExt;

use owpro_core::llm::pricing::format_cost;
use owpro_types::llm::{GenerationOptions, GenerationRequest, GenerationResult};

use crate::state::AppState;

/// Arguments of one generate invocation.
pub struct GenerateArgs {
    pub model: String,
    pub fallback: Option<String>,
    pub stream: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub prompt: String,
}

impl GenerateArgs {
    pub fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::from_prompt(self.model, self.prompt);
        request.fallback_model_id = self.fallback;
        request.stream = self.stream;
        request.options = GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        request
    }
}

pub async fn generate(state: &AppState, args: GenerateArgs, json: bool) -> Result<()> {
    let request = args.into_request();
    if request.stream {
        stream(state, &request, json).await
    } else {
        let result = state.router.route(&request).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!();
            println!("{}", result.content);
            print_footer(state, &result);
        }
        Ok(())
    }
}

async fn stream(state: &AppState, request: &GenerationRequest, json: bool) -> Result<()> {
    let mut events = state.router.stream_route(request).await?;

    if !json {
        println!();
    }
    while let Some(event) = events.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print!("{}", event.content_delta);
            let _ = std::io::stdout().flush();
        }

        if let Some(error) = &event.error {
            if !json {
                println!();
            }
            bail!("stream aborted after {}ms: {error}", event.latency_ms_so_far);
        }
        if event.done && !json {
            println!();
            println!(
                "\n  {} {} {} {:.1}s",
                style("|").dim(),
                style(&event.model_id).dim(),
                style("\u{00b7}").dim(),
                style(event.latency_ms_so_far as f64 / 1000.0).dim(),
            );
        }
    }
    Ok(())
}

/// Print the stats footer after a response.
///
/// Format: "| {tokens} tokens . {time}s . {model} via {route} . {cost}"
fn print_footer(state: &AppState, result: &GenerationResult) {
    let cost = state
        .router
        .ledger()
        .pricing()
        .estimate_cost(&result.provider_model, u64::from(result.usage.total_tokens));
    let tokens = if result.usage_reported {
        result.usage.total_tokens.to_string()
    } else {
        "?".to_string()
    };
    println!(
        "\n  {} {} tokens {} {:.1}s {} {} via {} {} {}",
        style("|").dim(),
        style(tokens).dim(),
        style("\u{00b7}").dim(),
        style(result.latency_ms as f64 / 1000.0).dim(),
        style("\u{00b7}").dim(),
        style(&result.model_id).dim(),
        style(result.route).dim(),
        style("\u{00b7}").dim(),
        style(format_cost(cost)).dim(),
    );
}
