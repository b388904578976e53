//! tabula CLI - Command-line interface for the tabula migration planner.
//!
//! This crate provides the `tabula` binary: validating a declared schema,
//! planning the migration from a snapshot to it, and writing the rendered
//! statements to a `.sql` script.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
