//! Tabular metric logging with pluggable outputs.
//!
//! Training code records scalar key/value pairs into the current table via
//! [`Logger::record`]; [`Logger::dump`] hands the finished table to every
//! registered [`LogOutput`] and starts a fresh one. Free-form messages go
//! through [`Logger::log`].
//!
//! ```
//! use ml::logger::{Logger, Tabular, LogOutput};
//!
//! #[derive(Default)]
//! struct Count(usize);
//!
//! impl LogOutput for Count {
//!     fn write_tabular(&mut self, _step: u64, table: &Tabular) -> anyhow::Result<()> {
//!         self.0 += table.len();
//!         Ok(())
//!     }
//! }
//!
//! let mut logger = Logger::new();
//! logger.add_output(Count::default());
//! logger.record("Itr", 0.0);
//! logger.dump(0).unwrap();
//! ```

mod csv;
mod std_out;
mod tensorboard;
mod text;

pub use self::csv::{read_csv_columns, CsvOutput};
pub use self::std_out::StdOutput;
pub use self::tensorboard::{crc32c, TensorBoardOutput};
pub use self::text::TextOutput;

use anyhow::Result;

/// Ordered collection of the scalars recorded since the last dump.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tabular {
    entries: Vec<(String, f64)>,
}

impl Tabular {
    /// Inserts `key`, overwriting any value recorded earlier in this table
    /// while keeping its original position.
    pub fn record(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A destination for log messages and tabular dumps.
pub trait LogOutput: Send {
    fn write_text(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }

    fn write_tabular(&mut self, _step: u64, _table: &Tabular) -> Result<()> {
        Ok(())
    }

    /// Flushes and releases underlying resources.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Logger {
    outputs: Vec<Box<dyn LogOutput>>,
    tabular: Tabular,
}

impl Logger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_output(&mut self, output: impl LogOutput + 'static) {
        self.outputs.push(Box::new(output));
    }

    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Sends a free-form message to every output.
    ///
    /// # Errors
    ///
    /// Fails if any output cannot be written.
    pub fn log(&mut self, message: &str) -> Result<()> {
        for output in &mut self.outputs {
            output.write_text(message)?;
        }
        Ok(())
    }

    pub fn record(&mut self, key: impl Into<String>, value: f64) {
        self.tabular.record(key, value);
    }

    /// The table being accumulated for the next dump.
    #[must_use]
    pub fn tabular(&self) -> &Tabular {
        &self.tabular
    }

    /// Writes the current table to every output and clears it.
    ///
    /// # Errors
    ///
    /// Fails if any output cannot be written.
    pub fn dump(&mut self, step: u64) -> Result<()> {
        if self.tabular.is_empty() {
            return Ok(());
        }
        for output in &mut self.outputs {
            output.write_tabular(step, &self.tabular)?;
        }
        self.tabular.clear();
        Ok(())
    }

    /// Closes and detaches every output.
    ///
    /// # Errors
    ///
    /// Returns the first close failure; remaining outputs are still closed.
    pub fn remove_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for mut output in self.outputs.drain(..) {
            if let Err(e) = output.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<(u64, Tabular)>>>);

    impl LogOutput for Capture {
        fn write_tabular(&mut self, step: u64, table: &Tabular) -> Result<()> {
            self.0.lock().unwrap().push((step, table.clone()));
            Ok(())
        }
    }

    #[test]
    fn record_overwrites_in_place() {
        let mut t = Tabular::default();
        t.record("a", 1.0);
        t.record("b", 2.0);
        t.record("a", 3.0);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(t.get("a"), Some(3.0));
    }

    #[test]
    fn dump_clears_and_skips_empty_tables() {
        let capture = Capture::default();
        let mut logger = Logger::new();
        logger.add_output(capture.clone());
        logger.record("x", 1.0);
        logger.dump(4).unwrap();
        logger.dump(5).unwrap();
        let seen = capture.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 4);
        assert!(logger.tabular().is_empty());
    }

    #[test]
    fn remove_all_detaches_outputs() {
        let mut logger = Logger::new();
        logger.add_output(Capture::default());
        logger.remove_all().unwrap();
        assert_eq!(logger.n_outputs(), 0);
    }
}
