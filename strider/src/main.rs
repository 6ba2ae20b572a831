//! # Strider Runtime
//!
//! Entry point for the `strider` binary. Argument parsing and the command
//! implementations live in [`app`].

mod app;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    app::run(app::Cli::parse())
}
