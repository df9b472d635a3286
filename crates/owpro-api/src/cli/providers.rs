//! `owpro providers`: probe both providers.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub async fn providers(state: &AppState, json: bool) -> Result<()> {
    let results = state.router.prober().probe_all().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("Provider Health").bold());
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Provider").fg(Color::White),
        Cell::new("Endpoint").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Latency").fg(Color::White),
        Cell::new("Models").fg(Color::White),
        Cell::new("Error").fg(Color::White),
    ]);

    for result in &results {
        let endpoint = match result.provider {
            owpro_types::llm::ProviderKind::Local => &state.config.local.base_url,
            owpro_types::llm::ProviderKind::Remote => &state.config.remote.base_url,
        };
        let status_cell = if result.available {
            Cell::new("up").fg(Color::Green)
        } else {
            Cell::new("DOWN").fg(Color::Red)
        };
        let latency = result
            .latency_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let error = result.error.as_deref().unwrap_or("-");
        let error_display = if error.chars().count() > 40 {
            format!("{}...", error.chars().take(37).collect::<String>())
        } else {
            error.to_string()
        };

        table.add_row(vec![
            Cell::new(result.provider).fg(Color::Cyan),
            Cell::new(endpoint).fg(Color::DarkGrey),
            status_cell,
            Cell::new(latency).fg(Color::White),
            Cell::new(result.known_model_ids.len()).fg(Color::White),
            Cell::new(error_display).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}
