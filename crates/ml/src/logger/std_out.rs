use std::fmt::Write as _;

use anyhow::Result;

use super::{LogOutput, Tabular};

/// Console output through `tracing`.
#[derive(Debug, Default)]
pub struct StdOutput;

impl StdOutput {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn format_table(table: &Tabular) -> String {
    let width = table.keys().map(str::len).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in table.iter() {
        let _ = writeln!(out, "{key:<width$}  {value:.6}");
    }
    out
}

impl LogOutput for StdOutput {
    fn write_text(&mut self, message: &str) -> Result<()> {
        tracing::info!("{message}");
        Ok(())
    }

    fn write_tabular(&mut self, step: u64, table: &Tabular) -> Result<()> {
        tracing::info!(step, "\n{}", format_table(table));
        Ok(())
    }
}
