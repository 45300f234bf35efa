//! Dual-header CSV reader
//! Loads the data rows as text with Polars, then applies the declared type of
//! each column on a best-effort basis.

use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::coerce::coerce_column;
use super::diagnostic::Diagnostic;
use super::options::CsvOptions;
use super::table::{KeyedFrame, TableError};
use crate::format::{dtype_for_tag, ROW_ID_COLUMN};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse header lines: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to load CSV: {0}")]
    Polars(#[from] PolarsError),
    #[error("File is empty")]
    EmptyFile,
    #[error("Missing type declaration line")]
    MissingTypeLine,
    #[error("First column must be 'Row ID', found '{found}'")]
    MissingRowId { found: String },
    #[error("Invalid table: {0}")]
    Table(#[from] TableError),
}

/// A loaded table plus the columns that kept their inferred dtype.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub table: KeyedFrame,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lines 1 and 2 of the file.
struct Header {
    /// Column names, `Row ID` first.
    names: Vec<String>,
    /// Declared tag per data column.
    declared: HashMap<String, String>,
    has_rows: bool,
}

/// Read a dual-header CSV file with default options.
pub fn read_csv(path: impl AsRef<Path>) -> Result<ReadOutcome, ReadError> {
    read_csv_with(path, &CsvOptions::default())
}

/// Read a dual-header CSV file.
pub fn read_csv_with(path: impl AsRef<Path>, opts: &CsvOptions) -> Result<ReadOutcome, ReadError> {
    let path = path.as_ref();
    debug!("reading {}", path.display());

    let bytes = std::fs::read(path)?;
    let outcome = read_csv_bytes(&bytes, opts)?;

    info!(
        "read {} rows x {} columns from {} ({} diagnostics)",
        outcome.table.height(),
        outcome.table.data().width(),
        path.display(),
        outcome.diagnostics.len()
    );
    Ok(outcome)
}

/// Read dual-header CSV content already in memory.
///
/// Every column is loaded as text and converted to its declared type. Each
/// column that cannot be converted produces exactly one
/// [`Diagnostic::CoercionFailed`] and takes the type Polars infers for it
/// instead, or stays text when even inference fails.
pub fn read_csv_bytes(bytes: &[u8], opts: &CsvOptions) -> Result<ReadOutcome, ReadError> {
    let header = read_header(bytes, opts)?;

    let (row_ids, raw) = if header.has_rows {
        let mut df = read_rows(bytes, &header, opts, &[])?;
        let row_ids = df.drop_in_place(ROW_ID_COLUMN)?;
        (row_ids, df)
    } else {
        empty_parts(&header)?
    };

    let (mut columns, diagnostics): (Vec<Column>, Vec<Option<Diagnostic>>) = raw
        .get_columns()
        .par_iter()
        .map(|column| apply_declared(column, &header, opts))
        .unzip();
    let diagnostics: Vec<Diagnostic> = diagnostics.into_iter().flatten().collect();

    for diagnostic in &diagnostics {
        warn!("{}", diagnostic);
    }

    if header.has_rows && !diagnostics.is_empty() {
        restore_inferred(bytes, &header, opts, &diagnostics, &mut columns);
    }

    let table = KeyedFrame::new(row_ids, DataFrame::new(columns)?)?;
    Ok(ReadOutcome { table, diagnostics })
}

/// Swap the text columns that failed coercion for their inferred versions.
///
/// An inference failure is logged and leaves those columns as text.
fn restore_inferred(
    bytes: &[u8],
    header: &Header,
    opts: &CsvOptions,
    diagnostics: &[Diagnostic],
    columns: &mut [Column],
) {
    let failed: Vec<&str> = diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::CoercionFailed { column, .. } => Some(column.as_str()),
            _ => None,
        })
        .collect();

    let inferred = match read_rows(bytes, header, opts, &failed) {
        Ok(df) => df,
        Err(e) => {
            debug!("keeping {} as text, inference failed: {}", failed.join(", "), e);
            return;
        }
    };

    for column in columns.iter_mut() {
        if failed.contains(&column.name().as_str()) {
            if let Ok(found) = inferred.column(column.name().as_str()) {
                *column = found.clone();
            }
        }
    }
}

/// Parse the name and type lines, and check every data row has as many fields.
fn read_header(bytes: &[u8], opts: &CsvOptions) -> Result<Header, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(opts.separator)
        .quote(opts.quote_char)
        .has_headers(false)
        .from_reader(bytes);
    let mut records = reader.records();

    let names = records.next().ok_or(ReadError::EmptyFile)??;
    let names: Vec<String> = names.iter().map(str::to_string).collect();
    match names.first() {
        Some(first) if first == ROW_ID_COLUMN => {}
        other => {
            return Err(ReadError::MissingRowId {
                found: other.cloned().unwrap_or_default(),
            })
        }
    }

    let tags = records.next().ok_or(ReadError::MissingTypeLine)??;
    // The reader is not flexible, so a ragged row anywhere is an error here.
    let mut data_rows = 0usize;
    for record in records {
        record?;
        data_rows += 1;
    }
    let has_rows = data_rows > 0;

    let declared = names
        .iter()
        .zip(tags.iter())
        .skip(1)
        .map(|(name, tag)| (name.clone(), tag.to_string()))
        .collect();

    Ok(Header {
        names,
        declared,
        has_rows,
    })
}

/// Load the data rows, skipping the type line.
///
/// Every column is read verbatim as text except those named in `inferred`,
/// which go through Polars type inference.
fn read_rows(
    bytes: &[u8],
    header: &Header,
    opts: &CsvOptions,
    inferred: &[&str],
) -> Result<DataFrame, ReadError> {
    let verbatim = Schema::from_iter(
        header
            .names
            .iter()
            .enumerate()
            .filter(|(i, name)| *i == 0 || !inferred.contains(&name.as_str()))
            .map(|(_, name)| Field::new(name.as_str().into(), DataType::String)),
    );

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows_after_header(1)
        .with_infer_schema_length(opts.infer_schema_length)
        .with_schema_overwrite(Some(Arc::new(verbatim)))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(opts.separator)
                .with_quote_char(Some(opts.quote_char)),
        )
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    Ok(df)
}

/// Zero-row id column and text data columns for a file without data rows.
fn empty_parts(header: &Header) -> Result<(Column, DataFrame), ReadError> {
    let row_ids = Series::new_empty(ROW_ID_COLUMN.into(), &DataType::String).into_column();
    let columns = header
        .names
        .iter()
        .skip(1)
        .map(|name| Series::new_empty(name.as_str().into(), &DataType::String).into_column())
        .collect();
    Ok((row_ids, DataFrame::new(columns)?))
}

fn apply_declared(
    column: &Column,
    header: &Header,
    opts: &CsvOptions,
) -> (Column, Option<Diagnostic>) {
    let name = column.name().as_str();
    let Some(tag) = header.declared.get(name) else {
        return (column.clone(), None);
    };

    let converted = match dtype_for_tag(tag) {
        Some(dtype) => {
            coerce_column(column, &dtype, &opts.datetime_format).map_err(|e| e.to_string())
        }
        None => Err(format!("unknown type tag '{}'", tag)),
    };

    match converted {
        Ok(column) => (column, None),
        Err(reason) => (
            column.clone(),
            Some(Diagnostic::CoercionFailed {
                column: name.to_string(),
                declared: tag.clone(),
                reason,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str) -> Result<ReadOutcome, ReadError> {
        read_csv_bytes(content.as_bytes(), &CsvOptions::default())
    }

    #[test]
    fn test_reads_declared_types() {
        let outcome = read("Row ID,x,y\nINDEX,int,object\nr0,5,hello\n").unwrap();
        let table = &outcome.table;

        assert!(outcome.diagnostics.is_empty());
        assert_eq!(table.row_id_values(), vec!["r0"]);
        assert_eq!(table.column_names(), vec!["x", "y"]);

        let x = table.column("x").unwrap();
        assert_eq!(x.dtype(), &DataType::Int64);
        assert_eq!(x.i64().unwrap().get(0), Some(5));

        let y = table.column("y").unwrap();
        assert_eq!(y.dtype(), &DataType::String);
        assert_eq!(y.str().unwrap().get(0), Some("hello"));
    }

    #[test]
    fn test_incompatible_declared_type_keeps_inferred() {
        let outcome = read("Row ID,x\nINDEX,int\nr0,abc\nr1,def\n").unwrap();

        let x = outcome.table.column("x").unwrap();
        assert_eq!(x.dtype(), &DataType::String);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].mentions("x"));
    }

    #[test]
    fn test_one_diagnostic_per_failing_column() {
        let outcome = read(
            "Row ID,a,b,c\n\
             INDEX,int,bool,float\n\
             r0,abc,maybe,1.5\n\
             r1,7,true,2\n",
        )
        .unwrap();

        assert_eq!(outcome.diagnostics.len(), 2);
        assert_eq!(outcome.diagnostics.iter().filter(|d| d.mentions("a")).count(), 1);
        assert_eq!(outcome.diagnostics.iter().filter(|d| d.mentions("b")).count(), 1);
        assert_eq!(
            outcome.table.column("c").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_unknown_tag_is_a_diagnostic() {
        let outcome = read("Row ID,x\nINDEX,complex128\nr0,1\n").unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.table.column("x").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_text_columns_read_verbatim() {
        let outcome = read("Row ID,code\nINDEX,object\n001,007\n002,010\n").unwrap();

        assert_eq!(outcome.table.row_id_values(), vec!["001", "002"]);
        let code = outcome.table.column("code").unwrap();
        let values: Vec<Option<&str>> = code.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("007"), Some("010")]);
    }

    #[test]
    fn test_timestamps_and_booleans() {
        let outcome = read(
            "Row ID,t,b\n\
             INDEX,datetime64[ns],bool\n\
             r0,2024-01-02_03:04:05,True\n\
             r1,,False\n",
        )
        .unwrap();

        assert!(outcome.diagnostics.is_empty());
        let t = outcome.table.column("t").unwrap();
        assert_eq!(t.dtype(), &DataType::Datetime(TimeUnit::Nanoseconds, None));
        assert_eq!(t.null_count(), 1);
        let b = outcome.table.column("b").unwrap();
        let values: Vec<Option<bool>> = b.bool().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let outcome = read("Row ID,x,y\nINDEX,int,object\n").unwrap();

        assert_eq!(outcome.table.height(), 0);
        assert_eq!(outcome.table.column_names(), vec!["x", "y"]);
        assert_eq!(outcome.table.column("x").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_wrong_row_id_label_is_fatal() {
        let err = read("Key,x\nINDEX,int\nr0,1\n").unwrap_err();
        assert!(matches!(err, ReadError::MissingRowId { ref found } if found == "Key"));
    }

    #[test]
    fn test_wrong_delimiter_is_fatal() {
        let err = read("Row ID;x\nINDEX;int\nr0;1\n").unwrap_err();
        assert!(matches!(err, ReadError::MissingRowId { .. }));
    }

    #[test]
    fn test_missing_lines_are_fatal() {
        assert!(matches!(read("").unwrap_err(), ReadError::EmptyFile));
        assert!(matches!(
            read("Row ID,x\n").unwrap_err(),
            ReadError::MissingTypeLine
        ));
    }

    #[test]
    fn test_ragged_type_line_is_fatal() {
        let err = read("Row ID,x,y\nINDEX,int\nr0,1,2\n").unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));
    }

    #[test]
    fn test_duplicate_row_ids_are_fatal() {
        let err = read("Row ID,x\nINDEX,int\nr0,1\nr0,2\n").unwrap_err();
        assert!(matches!(err, ReadError::Table(TableError::DuplicateRowId(_))));
    }

    #[test]
    fn test_custom_separator() {
        let opts = CsvOptions::default().with_separator(b';');
        let outcome = read_csv_bytes(b"Row ID;x\nINDEX;float\nr0;1.25\n", &opts).unwrap();
        let x = outcome.table.column("x").unwrap();
        assert_eq!(x.f64().unwrap().get(0), Some(1.25));
    }

    #[test]
    fn test_bad_value_after_many_rows_is_a_diagnostic() {
        let mut content = String::from("Row ID,x,y\nINDEX,int,int\n");
        for i in 0..10_000 {
            content.push_str(&format!("r{},{},{}\n", i, i, i));
        }
        content.push_str("rlast,abc,1\n");

        let outcome = read(&content).unwrap();

        assert_eq!(outcome.table.height(), 10_001);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].mentions("x"));
        let x = outcome.table.column("x").unwrap();
        assert_eq!(x.dtype(), &DataType::String);
        assert_eq!(x.str().unwrap().get(10_000), Some("abc"));
        assert_eq!(outcome.table.column("y").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_short_inference_window_keeps_failing_column_as_text() {
        let opts = CsvOptions::default().with_infer_schema_length(Some(2));
        let outcome =
            read_csv_bytes(b"Row ID,x\nINDEX,int\nr0,1\nr1,2\nr2,abc\n", &opts).unwrap();

        assert_eq!(outcome.diagnostics.len(), 1);
        let x = outcome.table.column("x").unwrap();
        let values: Vec<Option<&str>> = x.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("1"), Some("2"), Some("abc")]);
    }

    #[test]
    fn test_short_later_row_is_fatal() {
        let err = read("Row ID,x,y\nINDEX,int,int\nr0,1,2\nr1,3\n").unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));

        let err = read("Row ID,x,y\nINDEX,int,int\nr0,1,2\nr1,3,4\nr2,5\n").unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = read_csv("/nonexistent/dir/table.csv").unwrap_err();
        assert!(matches!(err, ReadError::Io(_)));
    }
}
