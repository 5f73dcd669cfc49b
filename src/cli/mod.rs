//! Command-line interface for running and inspecting simulations
//!
//! Commands return `anyhow::Result`; library errors are wrapped with the
//! context of what the command was doing.

pub mod commands;
pub mod output;
