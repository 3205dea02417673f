// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports the migrate and tables commands

pub mod migrate;
pub mod tables;

pub use migrate::migrate;
pub use tables::tables;
