use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use super::{LogOutput, Tabular};

/// Timestamped plain-text log, conventionally `debug.log`.
pub struct TextOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TextOutput {
    /// # Errors
    ///
    /// Fails if the file or its parent directory cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if let Some(w) = self.writer.as_mut() {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(w, "{stamp} | {line}")?;
            w.flush()?;
        } else {
            tracing::debug!(path = %self.path.display(), "write to closed text log ignored");
        }
        Ok(())
    }
}

impl LogOutput for TextOutput {
    fn write_text(&mut self, message: &str) -> Result<()> {
        self.write_line(message)
    }

    fn write_tabular(&mut self, step: u64, table: &Tabular) -> Result<()> {
        self.write_line(&format!("step {step}"))?;
        for (key, value) in table.iter() {
            self.write_line(&format!("{key} {value}"))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        Ok(())
    }
}
