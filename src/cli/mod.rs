//! Terminal reports for each command.

pub mod allocation;
pub mod brokers;
pub mod events;
pub mod overview;
pub mod portfolio;
pub mod setup;
pub mod ui;
