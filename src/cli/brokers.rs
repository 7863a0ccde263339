use super::ui;
use crate::core::factory::SourceFactory;
use comfy_table::{Cell, Color};

/// Registered brokers with their switch state and advertised capabilities.
pub fn display_as_table(factory: &SourceFactory) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Broker"),
        ui::header_cell("Name"),
        ui::header_cell("Status"),
        ui::header_cell("Capabilities"),
    ]);

    for broker in factory.registry().iter() {
        let status = if factory.is_enabled(&broker.id) {
            Cell::new("enabled").fg(Color::Green)
        } else {
            Cell::new("disabled").fg(Color::DarkGrey)
        };
        let capabilities = broker
            .capabilities
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&broker.id),
            Cell::new(&broker.display_name),
            status,
            Cell::new(capabilities),
        ]);
    }

    table.to_string()
}

pub fn run(factory: &SourceFactory) {
    if factory.registry().is_empty() {
        println!("No brokers configured.");
        return;
    }
    println!(
        "\n{}\n",
        ui::style_text("Brokers", ui::StyleType::Title)
    );
    println!("{}", display_as_table(factory));
}
