//! CLI subcommand implementations for chain-cache

pub mod clear;
pub mod invalidate;
pub mod output;
pub mod show;
pub mod status;
