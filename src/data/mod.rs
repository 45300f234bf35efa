//! Data module - keyed tables, reading, writing and coercion

mod coerce;
mod diagnostic;
mod options;
mod reader;
mod table;
mod writer;

pub use coerce::coerce_column;
pub use diagnostic::Diagnostic;
pub use options::{CsvOptions, LineEnding};
pub use reader::{read_csv, read_csv_bytes, read_csv_with, ReadError, ReadOutcome};
pub use table::{KeyedFrame, TableError};
pub use writer::{write_csv, write_csv_to, write_csv_with, WriteError, WriteOutcome};
