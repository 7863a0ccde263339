use super::ui;
use crate::core::models::{AccountOverview, PortfolioSelector};
use crate::core::service::PortfolioService;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::BTreeMap;

pub async fn run(service: &PortfolioService, selector: &PortfolioSelector) -> Result<()> {
    let pb = ui::new_spinner("Fetching account overview...");
    let result = service.account_overview(selector).await;
    pb.finish_and_clear();
    let envelope = result?;

    println!(
        "\nAccount overview: {}\n",
        ui::style_text(&selector.to_string(), ui::StyleType::Title)
    );
    match &envelope.data {
        Some(overview) => println!("{}", display_as_table(overview)),
        None => println!("No account overview reported."),
    }
    ui::print_availability(&envelope.availability);
    ui::print_separator();
    Ok(())
}

/// History table followed by the totals line.
pub fn display_as_table(overview: &AccountOverview) -> String {
    let currency = &overview.total.currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell(&format!("Cash ({currency})")),
    ]);

    let mut by_date = BTreeMap::new();
    for point in &overview.value_history {
        by_date.entry(point.date).or_insert((None, None)).0 = Some(point.value);
    }
    for point in &overview.cash_history {
        by_date.entry(point.date).or_insert((None, None)).1 = Some(point.value);
    }
    for (date, (value, cash)) in by_date {
        table.add_row(vec![
            Cell::new(date.to_string()),
            ui::format_optional_cell(value, |v| format!("{:.2}", v.round_dp(2))),
            ui::format_optional_cell(cash, |v| format!("{:.2}", v.round_dp(2))),
        ]);
    }

    let total = &overview.total;
    format!(
        "{table}\n\n{} {}\n{} {}",
        ui::style_text(&format!("Total Value ({currency}):"), ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}", total.total_value.round_dp(2)),
            ui::StyleType::TotalValue
        ),
        ui::style_text("Gain/Loss:", ui::StyleType::TotalLabel),
        format_args!(
            "{:.2} ({:.2}%)",
            total.total_gain_loss.round_dp(2),
            total.total_gain_loss_pct.round_dp(2)
        ),
    )
}
