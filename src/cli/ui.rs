use crate::core::envelope::BrokerAvailability;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned amount with two decimals.
pub fn money_cell(value: Decimal, currency: &str) -> Cell {
    Cell::new(format!("{:.2} {}", value.round_dp(2), currency)).set_alignment(CellAlignment::Right)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Creates a cell for a gain or loss, green when non-negative.
pub fn change_cell(change: Decimal, suffix: &str) -> Cell {
    let text = format!("{:.2}{}", change.round_dp(2), suffix);
    let color = if change.is_sign_negative() && !change.is_zero() {
        Color::Red
    } else {
        Color::Green
    };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Spinner shown while brokers are being queried.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Lines describing brokers that were skipped or failed. Empty when every
/// considered broker answered.
pub fn availability_lines(availability: &[BrokerAvailability]) -> Vec<String> {
    availability
        .iter()
        .filter_map(|a| {
            if !a.enabled {
                Some(format!("{}: disabled", a.broker))
            } else if a.is_failed() {
                Some(format!(
                    "{}: {}",
                    a.broker,
                    a.error.as_deref().unwrap_or("unknown error")
                ))
            } else {
                None
            }
        })
        .collect()
}

/// Prints the unavailable brokers banner below a report.
pub fn print_availability(availability: &[BrokerAvailability]) {
    let lines = availability_lines(availability);
    if lines.is_empty() {
        return;
    }
    println!(
        "\n{}",
        style_text("Unavailable brokers", StyleType::TotalLabel)
    );
    for line in lines {
        println!("  {}", style_text(&line, StyleType::Error));
    }
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SourceError;
    use crate::core::models::BrokerId;

    #[test]
    fn test_availability_lines_skip_healthy_brokers() {
        let availability = vec![
            BrokerAvailability::succeeded(BrokerId::new("degiro")),
            BrokerAvailability::not_supported(BrokerId::new("trading212")),
            BrokerAvailability::disabled(BrokerId::new("bitvavo")),
            BrokerAvailability::failed(
                BrokerId::new("kraken"),
                &SourceError::Connection("connection refused".to_string()),
            ),
        ];

        let lines = availability_lines(&availability);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "bitvavo: disabled");
        assert!(lines[1].starts_with("kraken: "));
        assert!(lines[1].contains("connection refused"));
    }

    #[test]
    fn test_money_cell_rounds() {
        let cell = money_cell(Decimal::new(12346, 3), "EUR");
        assert_eq!(cell.content(), "12.35 EUR");
    }
}
