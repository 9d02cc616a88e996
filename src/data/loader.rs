//! CSV ingestion

use crate::error::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Loads listing files with every column read as text.
///
/// Schema inference is disabled so that currency strings, empty cells and
/// free-form categories all arrive untouched; typing happens in cleaning.
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    separator: Option<u8>,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a delimiter other than `,`
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut options = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0));
        if let Some(sep) = self.separator {
            options = options.with_parse_options(CsvParseOptions::default().with_separator(sep));
        }

        let df = options.into_reader_with_file_handle(file).finish()?;

        debug!(columns = ?df.get_column_names(), "CSV header");
        info!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded listings");
        Ok(df)
    }
}
