//! `owpro models`: registry table with live availability.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::catalog::model_catalog;
use crate::state::AppState;

pub async fn models(state: &AppState, json: bool) -> Result<()> {
    let catalog = model_catalog(&state.router).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("Models").bold());
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Model").fg(Color::White),
        Cell::new("Provider").fg(Color::White),
        Cell::new("Context").fg(Color::White),
        Cell::new("Max Tokens").fg(Color::White),
        Cell::new("Temp").fg(Color::White),
        Cell::new("Available").fg(Color::White),
    ]);

    for model in &catalog.models {
        let available = match model.served_by {
            Some(_) if !model.available => Cell::new("not installed").fg(Color::Yellow),
            Some(kind) if kind == model.descriptor.provider_kind => {
                Cell::new("yes").fg(Color::Green)
            }
            Some(kind) => Cell::new(format!("via {kind}")).fg(Color::Yellow),
            None => Cell::new("no").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&model.descriptor.id).fg(Color::Cyan),
            Cell::new(model.descriptor.provider_kind).fg(Color::DarkGrey),
            Cell::new(model.descriptor.context_window).fg(Color::White),
            Cell::new(model.descriptor.max_tokens).fg(Color::White),
            Cell::new(model.descriptor.temperature).fg(Color::White),
            available,
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "  {} model{}",
        style(catalog.models.len()).bold(),
        if catalog.models.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
