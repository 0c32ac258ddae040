//! CLI module for the key quota gateway

pub mod serve;

use clap::{Parser, Subcommand};

/// Key quota gateway - per-key daily quotas and usage statistics
#[derive(Parser)]
#[command(name = "key-quota-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the admin and admission API
    Serve(serve::ServeArgs),
}
