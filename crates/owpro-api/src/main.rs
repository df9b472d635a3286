//! OpenWebUI Pro AI gateway: CLI and REST API entry point.
//!
//! Binary name: `owpro`
//!
//! Parses CLI arguments, loads configuration, wires the request router, then
//! dispatches to the appropriate command handler or starts the REST API server.

mod catalog;
mod cli;
mod http;
mod state;

use clap::Parser;

use owpro_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // LOG_LEVEL applies unless -v / --quiet were given; RUST_LOG beats both.
    let default_filter = match std::env::var("LOG_LEVEL") {
        Ok(level) if cli.verbose == 0 && !cli.quiet && !level.trim().is_empty() => level,
        _ => cli.default_log_filter().to_string(),
    };
    init_tracing(&TracingOptions {
        default_filter,
        json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    let outcome = run(cli, state).await;
    shutdown_tracing();
    outcome
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} OpenWebUI Pro gateway listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style(format!(
                    "Config: {}",
                    state.data_dir.join("config.toml").display()
                ))
                .dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Generate {
            model,
            fallback,
            stream,
            temperature,
            max_tokens,
            prompt,
        } => {
            let args = cli::generate::GenerateArgs {
                model,
                fallback,
                stream,
                temperature,
                max_tokens,
                prompt: prompt.join(" "),
            };
            cli::generate::generate(&state, args, cli.json).await?;
        }

        Commands::Providers => {
            cli::providers::providers(&state, cli.json).await?;
        }

        Commands::Models => {
            cli::models::models(&state, cli.json).await?;
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
