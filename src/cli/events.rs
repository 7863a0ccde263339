use super::ui;
use crate::core::envelope::ResultEnvelope;
use crate::core::models::{BrokerId, Deposit, Dividend, Fee, PortfolioSelector, Transaction};
use crate::core::service::PortfolioService;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

/// Which event list a report shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Transactions,
    Deposits,
    Dividends,
    Fees,
}

impl EventKind {
    fn title(&self) -> &'static str {
        match self {
            EventKind::Transactions => "Transactions",
            EventKind::Deposits => "Deposits",
            EventKind::Dividends => "Dividends",
            EventKind::Fees => "Fees",
        }
    }
}

/// A record that renders as one table row.
pub trait EventRow {
    fn headers() -> Vec<&'static str>;
    fn cells(&self) -> Vec<Cell>;
}

fn broker_cell(broker: &Option<BrokerId>) -> Cell {
    let name = broker.as_ref().map_or("", |b| b.as_str());
    Cell::new(ui::style_text(name, ui::StyleType::Subtle))
}

impl EventRow for Transaction {
    fn headers() -> Vec<&'static str> {
        vec!["Date", "Symbol", "Type", "Quantity", "Price", "Amount", "Broker"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.date),
            Cell::new(&self.symbol),
            Cell::new(format!("{:?}", self.kind)),
            Cell::new(self.quantity.normalize()).set_alignment(CellAlignment::Right),
            ui::money_cell(self.price, &self.currency),
            ui::money_cell(self.amount, &self.currency),
            broker_cell(&self.source_broker),
        ]
    }
}

impl EventRow for Deposit {
    fn headers() -> Vec<&'static str> {
        vec!["Date", "Amount", "Description", "Broker"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.date),
            ui::money_cell(self.amount, &self.currency),
            Cell::new(self.description.as_deref().unwrap_or("")),
            broker_cell(&self.source_broker),
        ]
    }
}

impl EventRow for Dividend {
    fn headers() -> Vec<&'static str> {
        vec!["Date", "Symbol", "Amount", "Broker"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.date),
            Cell::new(&self.symbol),
            ui::money_cell(self.amount, &self.currency),
            broker_cell(&self.source_broker),
        ]
    }
}

impl EventRow for Fee {
    fn headers() -> Vec<&'static str> {
        vec!["Date", "Symbol", "Description", "Amount", "Broker"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.date),
            Cell::new(self.symbol.as_deref().unwrap_or("")),
            Cell::new(self.description.as_deref().unwrap_or("")),
            ui::money_cell(self.amount, &self.currency),
            broker_cell(&self.source_broker),
        ]
    }
}

pub fn display_as_table<T: EventRow>(records: &[T]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(
        T::headers()
            .into_iter()
            .map(ui::header_cell)
            .collect::<Vec<_>>(),
    );
    for record in records {
        table.add_row(record.cells());
    }
    table.to_string()
}

fn print_report<T: EventRow>(
    kind: EventKind,
    selector: &PortfolioSelector,
    envelope: &ResultEnvelope<Vec<T>>,
) {
    println!(
        "\n{}: {}\n",
        kind.title(),
        ui::style_text(&selector.to_string(), ui::StyleType::Title)
    );
    if envelope.data.is_empty() {
        println!("No {} reported.", kind.title().to_lowercase());
    } else {
        println!("{}", display_as_table(&envelope.data));
    }
    ui::print_availability(&envelope.availability);
    ui::print_separator();
}

pub async fn run(
    service: &PortfolioService,
    selector: &PortfolioSelector,
    kind: EventKind,
) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {}...", kind.title().to_lowercase()));
    match kind {
        EventKind::Transactions => {
            let result = service.transactions(selector).await;
            pb.finish_and_clear();
            print_report(kind, selector, &result?);
        }
        EventKind::Deposits => {
            let result = service.deposits(selector).await;
            pb.finish_and_clear();
            print_report(kind, selector, &result?);
        }
        EventKind::Dividends => {
            let result = service.dividends(selector).await;
            pb.finish_and_clear();
            print_report(kind, selector, &result?);
        }
        EventKind::Fees => {
            let result = service.fees(selector).await;
            pb.finish_and_clear();
            print_report(kind, selector, &result?);
        }
    }
    Ok(())
}
