//! CSV export of aggregate views

use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::error::PipelineError;

/// Column-by-column builder for an output table
#[derive(Debug, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, values: Vec<Option<String>>) -> Self {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    /// Missing values are written as empty cells
    pub fn number(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn into_frame(self) -> crate::Result<DataFrame> {
        Ok(DataFrame::new(self.columns)?)
    }
}

/// Write a table with a header row, overwriting any previous file
pub fn write_table(table: Table, path: &Path) -> crate::Result<()> {
    let mut frame = table.into_frame()?;
    let mut file = File::create(path).map_err(|e| PipelineError::data_access(path, e))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;

    Ok(())
}
