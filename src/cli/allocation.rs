use super::ui;
use crate::core::allocation::Allocation;
use crate::core::models::PortfolioSelector;
use crate::core::service::PortfolioService;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

pub async fn run(service: &PortfolioService, selector: &PortfolioSelector) -> Result<()> {
    let pb = ui::new_spinner("Calculating allocation...");
    let result = service.allocation(selector).await;
    pb.finish_and_clear();
    let envelope = result?;

    println!(
        "\nAllocation: {}\n",
        ui::style_text(&selector.to_string(), ui::StyleType::Title)
    );
    println!("{}", display_as_table(&envelope.data));
    ui::print_availability(&envelope.availability);
    ui::print_separator();
    Ok(())
}

pub fn display_as_table(allocation: &Allocation) -> String {
    let currency = &allocation.currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Holdings"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("Allocation"),
    ]);

    let mut slices: Vec<_> = allocation.slices.iter().collect();
    slices.sort_by(|a, b| b.value.cmp(&a.value));
    for slice in slices {
        table.add_row(vec![
            Cell::new(slice.product_type.label()),
            Cell::new(slice.holdings).set_alignment(CellAlignment::Right),
            ui::money_cell(slice.value, currency),
            Cell::new(format!("{:.2}%", slice.weight_pct.round_dp(2)))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    let mut output = format!(
        "{table}\n\n{} {}",
        ui::style_text(&format!("Total Value ({currency}):"), ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}", allocation.total_value.round_dp(2)),
            ui::StyleType::TotalValue
        ),
    );
    for (symbol, reason) in &allocation.unallocated {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(&format!("Not allocated {symbol}: {reason}"), ui::StyleType::Error)
        ));
    }
    output
}
