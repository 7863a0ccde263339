use super::ui;
use crate::core::models::{PortfolioEntry, PortfolioSelector};
use crate::core::service::PortfolioService;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

pub async fn run(service: &PortfolioService, selector: &PortfolioSelector) -> Result<()> {
    let pb = ui::new_spinner("Fetching holdings...");
    let result = service.portfolio(selector).await;
    pb.finish_and_clear();
    let envelope = result?;

    println!(
        "\nPortfolio: {}\n",
        ui::style_text(&selector.to_string(), ui::StyleType::Title)
    );
    if envelope.data.is_empty() {
        println!("No holdings reported.");
    } else {
        println!("{}", display_as_table(&envelope.data));
    }
    ui::print_availability(&envelope.availability);
    ui::print_separator();
    Ok(())
}

pub fn display_as_table(entries: &[PortfolioEntry]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Quantity"),
        ui::header_cell("Break-even"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell("Unrealized"),
        ui::header_cell("Brokers"),
    ]);

    for entry in entries {
        let break_even = if entry.zero_quantity {
            Cell::new("N/A").set_alignment(CellAlignment::Right)
        } else {
            ui::money_cell(entry.break_even_price, &entry.currency)
        };
        let sources = entry
            .sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(&entry.symbol),
            Cell::new(&entry.display_name),
            Cell::new(entry.quantity.normalize()).set_alignment(CellAlignment::Right),
            break_even,
            ui::format_optional_cell(entry.current_price, |p| {
                format!("{:.2} {}", p.round_dp(2), entry.currency)
            }),
            ui::money_cell(entry.current_value, &entry.currency),
            ui::change_cell(entry.unrealized_gain, ""),
            Cell::new(ui::style_text(&sources, ui::StyleType::Subtle)),
        ]);
    }

    table.to_string()
}
