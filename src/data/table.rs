//! Keyed table: a DataFrame plus its row-identifier column.

use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

use crate::format::ROW_ID_COLUMN;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("{ids} row ids given for {rows} data rows")]
    LengthMismatch { ids: usize, rows: usize },
    #[error("Row ids must not be null")]
    NullRowId,
    #[error("Duplicate row id: {0}")]
    DuplicateRowId(String),
    #[error("Data column may not be named '{0}'")]
    ReservedName(String),
}

/// A table whose rows are keyed by a unique, non-null string identifier.
///
/// The identifier column is held apart from `data` and always carries the
/// name `Row ID`.
#[derive(Debug, Clone)]
pub struct KeyedFrame {
    row_ids: Column,
    data: DataFrame,
}

impl KeyedFrame {
    /// Pair `data` with its row identifiers.
    ///
    /// Identifiers of any dtype are cast to strings. Fails when the lengths
    /// disagree, an identifier is null or repeated, or a data column is
    /// itself called `Row ID`.
    pub fn new(row_ids: Column, data: DataFrame) -> Result<Self, TableError> {
        if let Some(name) = data
            .get_column_names()
            .into_iter()
            .find(|name| name.as_str() == ROW_ID_COLUMN)
        {
            return Err(TableError::ReservedName(name.to_string()));
        }

        let row_ids = row_ids
            .cast(&DataType::String)?
            .with_name(ROW_ID_COLUMN.into());

        if data.width() > 0 && row_ids.len() != data.height() {
            return Err(TableError::LengthMismatch {
                ids: row_ids.len(),
                rows: data.height(),
            });
        }

        let ids = row_ids.str()?;
        if ids.null_count() > 0 {
            return Err(TableError::NullRowId);
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids.into_no_null_iter() {
            if !seen.insert(id) {
                return Err(TableError::DuplicateRowId(id.to_string()));
            }
        }

        Ok(Self { row_ids, data })
    }

    /// Build from string identifiers.
    pub fn from_ids<S: AsRef<str>>(ids: &[S], data: DataFrame) -> Result<Self, TableError> {
        let ids: Vec<&str> = ids.iter().map(|s| s.as_ref()).collect();
        Self::new(Column::new(ROW_ID_COLUMN.into(), ids), data)
    }

    pub fn row_ids(&self) -> &Column {
        &self.row_ids
    }

    /// Row identifiers in row order.
    pub fn row_id_values(&self) -> Vec<String> {
        self.row_ids
            .str()
            .map(|ca| ca.into_no_null_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Get list of data column names (the identifier excluded).
    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Look up a data column by name.
    pub fn column(&self, name: &str) -> PolarsResult<&Column> {
        self.data.column(name)
    }

    pub fn height(&self) -> usize {
        self.row_ids.len()
    }

    pub fn into_parts(self) -> (Column, DataFrame) {
        (self.row_ids, self.data)
    }
}
