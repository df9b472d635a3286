//! CLI command definitions and dispatch for the `owpro` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod generate;
pub mod models;
pub mod providers;

use clap::{Parser, Subcommand};

/// Local-first AI gateway: Ollama with OpenAI fallback.
#[derive(Parser)]
#[command(name = "owpro", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (default: config / PORT, 3001).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (default: config / HOST, localhost).
        #[arg(long)]
        host: Option<String>,
    },

    /// Route one prompt and print the answer.
    #[command(alias = "gen")]
    Generate {
        /// Registry model id (e.g. llama2, gpt-4).
        #[arg(long, short)]
        model: String,

        /// Local model to use if the primary cannot be served locally.
        #[arg(long, short)]
        fallback: Option<String>,

        /// Print tokens as they arrive.
        #[arg(long)]
        stream: bool,

        /// Sampling temperature override.
        #[arg(long)]
        temperature: Option<f64>,

        /// Output token limit override.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// The prompt text.
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Probe both providers and show their status.
    Providers,

    /// List registered models and whether they can be served now.
    #[command(alias = "ls")]
    Models,
}

impl Cli {
    /// Default log filter implied by `-v` / `--quiet`, before `LOG_LEVEL`.
    ///
    /// `serve` logs route decisions at `info`; one-shot commands stay at
    /// `warn` so log lines do not interleave with their output.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 if matches!(self.command, Commands::Serve { .. }) => "info",
            0 => "warn",
            1 => "info,owpro=debug,owpro_core=debug,owpro_infra=debug,owpro_observe=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::parse_from([
            "owpro", "--json", "generate", "-m", "llama2", "--fallback", "mistral", "--stream",
            "say", "hi",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Generate {
                model,
                fallback,
                stream,
                prompt,
                ..
            } => {
                assert_eq!(model, "llama2");
                assert_eq!(fallback.as_deref(), Some("mistral"));
                assert!(stream);
                assert_eq!(prompt.join(" "), "say hi");
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_log_filter_from_flags() {
        assert_eq!(Cli::parse_from(["owpro", "models"]).default_log_filter(), "warn");
        assert_eq!(Cli::parse_from(["owpro", "serve"]).default_log_filter(), "info");
        assert_eq!(Cli::parse_from(["owpro", "--quiet", "serve"]).default_log_filter(), "error");
        let verbose = Cli::parse_from(["owpro", "-v", "generate", "-m", "llama2", "hi"]);
        for target in ["owpro=debug", "owpro_core=debug", "owpro_infra=debug"] {
            assert!(verbose.default_log_filter().contains(target));
        }
        assert_eq!(Cli::parse_from(["owpro", "--quiet", "models"]).default_log_filter(), "error");
        assert_eq!(Cli::parse_from(["owpro", "-vv", "models"]).default_log_filter(), "trace");
    }
}
