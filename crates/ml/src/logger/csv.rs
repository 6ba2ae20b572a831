use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::{LogOutput, Tabular};

/// Writes one CSV row per dump. The header is fixed by the first dump;
/// keys missing from a later table become blank cells and keys that were
/// not in the header are dropped with a warning.
pub struct CsvOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    fieldnames: Option<Vec<String>>,
    warned: bool,
}

impl CsvOutput {
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
            fieldnames: None,
            warned: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl LogOutput for CsvOutput {
    fn write_tabular(&mut self, _step: u64, table: &Tabular) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!("csv output {} is closed", self.path.display());
        };
        if self.fieldnames.is_none() {
            let names: Vec<String> = table.keys().map(str::to_string).collect();
            let header: Vec<String> = names.iter().map(|n| escape(n)).collect();
            writeln!(writer, "{}", header.join(","))?;
            self.fieldnames = Some(names);
        }
        let fieldnames = self.fieldnames.as_deref().unwrap_or_default();

        if !self.warned {
            let extra: Vec<&str> = table.keys().filter(|k| !fieldnames.iter().any(|f| f == k)).collect();
            if !extra.is_empty() {
                tracing::warn!(
                    path = %self.path.display(),
                    ?extra,
                    "inconsistent CSV keys; new keys are not written"
                );
                self.warned = true;
            }
        }

        let row: Vec<String> = fieldnames
            .iter()
            .map(|f| table.get(f).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writeln!(writer, "{}", row.join(","))?;
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        Ok(())
    }
}

fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}

/// Reads the named columns of a CSV file written by [`CsvOutput`].
/// Blank or unparsable cells become `NaN`.
///
/// # Errors
///
/// Fails if the file cannot be read or a requested column is absent.
pub fn read_csv_columns(path: impl AsRef<Path>, columns: &[&str]) -> Result<BTreeMap<String, Vec<f64>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = split_row(lines.next().unwrap_or_default());

    let mut indices = Vec::with_capacity(columns.len());
    for col in columns {
        match header.iter().position(|h| h == col) {
            Some(i) => indices.push(i),
            None => bail!("column {col:?} not found in {}", path.display()),
        }
    }

    let mut out: BTreeMap<String, Vec<f64>> = columns.iter().map(|c| ((*c).to_string(), Vec::new())).collect();
    for line in lines {
        let row = split_row(line);
        for (col, &i) in columns.iter().zip(&indices) {
            let value = row.get(i).and_then(|v| v.trim().parse().ok()).unwrap_or(f64::NAN);
            if let Some(values) = out.get_mut(*col) {
                values.push(value);
            }
        }
    }
    Ok(out)
}
