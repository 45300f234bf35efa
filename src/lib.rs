//! Dual-header CSV - typed table exchange for a scripting host
//!
//! Reads and writes the CSV convention where line 1 carries column names
//! (`Row ID` first), line 2 carries one type tag per column, and every
//! following line is a data row keyed by its row identifier.

pub mod data;
pub mod format;

pub use data::{
    read_csv, read_csv_bytes, read_csv_with, write_csv, write_csv_to, write_csv_with, CsvOptions,
    Diagnostic, KeyedFrame, LineEnding, ReadError, ReadOutcome, TableError, WriteError,
    WriteOutcome,
};
