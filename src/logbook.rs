//! Append-only log sheet.
//!
//! Rows are `timestamp,entry` with no header. Listings and actions are written
//! as blocks terminated by a delimiter row whose entry is [`DELIMITER`].

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

pub const DELIMITER: &str = "*****";

#[derive(Debug, Error)]
pub enum LogBookError {
    #[error("log sheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log sheet {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LogBook {
    path: PathBuf,
}

impl LogBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row per entry, then the delimiter.
    pub fn append_block<I, T>(&self, entries: I) -> Result<usize, LogBookError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut writer = self.writer()?;
        let stamp = Utc::now().to_rfc3339();
        let mut written = 0;

        for entry in entries {
            writer
                .write_record([stamp.as_str(), entry.as_ref()])
                .map_err(|source| self.csv_error(source))?;
            written += 1;
        }
        writer
            .write_record([stamp.as_str(), DELIMITER])
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| self.io_error(source))?;
        Ok(written)
    }

    /// Append a single entry as its own block.
    pub fn log_item(&self, item: &str) -> Result<(), LogBookError> {
        self.append_block([item]).map(|_| ())
    }

    /// All blocks in file order. A trailing block without delimiter is included.
    pub fn read_blocks(&self) -> Result<Vec<Vec<String>>, LogBookError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|source| self.csv_error(source))?;

        let mut blocks = Vec::new();
        let mut current = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| self.csv_error(source))?;
            let entry = record.get(1).unwrap_or_default();
            if entry == DELIMITER {
                blocks.push(std::mem::take(&mut current));
            } else {
                current.push(entry.to_string());
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        Ok(blocks)
    }

    /// The most recently written block.
    pub fn last_block(&self) -> Result<Vec<String>, LogBookError> {
        Ok(self.read_blocks()?.pop().unwrap_or_default())
    }

    fn writer(&self) -> Result<csv::Writer<fs::File>, LogBookError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        Ok(csv::WriterBuilder::new().has_headers(false).from_writer(file))
    }

    fn io_error(&self, source: std::io::Error) -> LogBookError {
        LogBookError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> LogBookError {
        LogBookError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn blocks_are_separated_by_delimiter() {
        let dir = TempDir::new().unwrap();
        let book = LogBook::new(dir.path().join("logs/sheet.csv"));

        assert_eq!(book.append_block(["Finance", "HR, Payroll"]).unwrap(), 2);
        book.log_item("/sites/team/Docs/erased").unwrap();

        let blocks = book.read_blocks().unwrap();
        assert_eq!(
            blocks,
            vec![
                vec!["Finance".to_string(), "HR, Payroll".to_string()],
                vec!["/sites/team/Docs/erased".to_string()],
            ]
        );
        assert_eq!(book.last_block().unwrap(), vec!["/sites/team/Docs/erased"]);
    }

    #[test]
    fn empty_listing_still_writes_delimiter() {
        let dir = TempDir::new().unwrap();
        let book = LogBook::new(dir.path().join("sheet.csv"));

        book.append_block(Vec::<String>::new()).unwrap();

        let raw = fs::read_to_string(book.path()).unwrap();
        assert!(raw.trim_end().ends_with(DELIMITER));
        assert_eq!(book.read_blocks().unwrap(), vec![Vec::<String>::new()]);
    }

    #[test]
    fn missing_sheet_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let book = LogBook::new(dir.path().join("none.csv"));
        assert!(book.read_blocks().unwrap().is_empty());
        assert!(book.last_block().unwrap().is_empty());
    }
}
