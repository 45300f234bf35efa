//! Dual-header CSV writer
//! Emits the name and type lines, then the data rows through Polars.

use polars::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::diagnostic::Diagnostic;
use super::options::CsvOptions;
use super::table::KeyedFrame;
use crate::format::{is_supported, native_tag, INDEX_TAG, ROW_ID_COLUMN};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write header lines: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to write CSV: {0}")]
    Polars(#[from] PolarsError),
}

/// Which columns made it into the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Data columns written, in order (the row id excluded).
    pub columns_written: Vec<String>,
    /// Columns left out because their dtype cannot be carried.
    pub dropped: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Write `table` to `path` with default options, replacing any existing file.
pub fn write_csv(path: impl AsRef<Path>, table: &KeyedFrame) -> Result<WriteOutcome, WriteError> {
    write_csv_with(path, table, &CsvOptions::default())
}

/// Write `table` to `path`, replacing any existing file.
///
/// A failure part-way through leaves a partially written file behind.
pub fn write_csv_with(
    path: impl AsRef<Path>,
    table: &KeyedFrame,
    opts: &CsvOptions,
) -> Result<WriteOutcome, WriteError> {
    let path = path.as_ref();
    debug!("writing {}", path.display());

    let mut out = BufWriter::new(File::create(path)?);
    let outcome = write_csv_to(&mut out, table, opts)?;
    out.flush()?;

    info!(
        "wrote {} rows x {} columns to {} ({} dropped)",
        table.height(),
        outcome.columns_written.len(),
        path.display(),
        outcome.dropped.len()
    );
    Ok(outcome)
}

/// Write `table` in the dual-header layout to any sink.
pub fn write_csv_to<W: Write>(
    mut writer: W,
    table: &KeyedFrame,
    opts: &CsvOptions,
) -> Result<WriteOutcome, WriteError> {
    let (supported, unsupported): (Vec<&Column>, Vec<&Column>) = table
        .data()
        .get_columns()
        .iter()
        .partition(|column| is_supported(column.dtype()));

    let columns_written: Vec<String> = supported.iter().map(|c| c.name().to_string()).collect();
    let dropped: Vec<String> = unsupported.iter().map(|c| c.name().to_string()).collect();

    let mut diagnostics = Vec::new();
    if !dropped.is_empty() {
        let diagnostic = Diagnostic::UnsupportedColumns {
            columns: dropped.clone(),
        };
        warn!("{}", diagnostic);
        diagnostics.push(diagnostic);
    }

    let names = std::iter::once(ROW_ID_COLUMN).chain(columns_written.iter().map(String::as_str));
    let tags = std::iter::once(INDEX_TAG).chain(supported.iter().filter_map(|c| native_tag(c.dtype())));

    {
        let mut header = csv::WriterBuilder::new()
            .delimiter(opts.separator)
            .quote(opts.quote_char)
            .terminator(opts.line_ending.csv_terminator())
            .from_writer(&mut writer);
        header.write_record(names)?;
        header.write_record(tags)?;
        header.flush()?;
    }

    let mut rows = DataFrame::new(
        std::iter::once(table.row_ids().clone())
            .chain(supported.into_iter().cloned())
            .collect(),
    )?;

    CsvWriter::new(&mut writer)
        .include_header(false)
        .with_separator(opts.separator)
        .with_quote_char(opts.quote_char)
        .with_datetime_format(Some(opts.datetime_format.clone()))
        .with_line_terminator(opts.line_ending.as_str().to_string())
        .finish(&mut rows)?;

    Ok(WriteOutcome {
        columns_written,
        dropped,
        diagnostics,
    })
}
