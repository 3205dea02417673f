// ABOUTME: Library module for sqlite-lake-loader
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod lake;
pub mod migration;
pub mod sqlite;
pub mod utils;
