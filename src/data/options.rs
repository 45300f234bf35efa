//! Read/write options shared by the reader and writer.

use crate::format::DATETIME_FORMAT;

/// Line terminator used for every line the writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    pub(crate) fn csv_terminator(self) -> csv::Terminator {
        match self {
            LineEnding::Lf => csv::Terminator::Any(b'\n'),
            LineEnding::CrLf => csv::Terminator::CRLF,
        }
    }
}

/// CSV dialect and inference settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub separator: u8,
    pub quote_char: u8,
    pub line_ending: LineEnding,
    /// chrono format for timestamp values in data rows
    pub datetime_format: String,
    /// Rows sampled when inferring the type of a column that failed its
    /// declared type; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            quote_char: b'"',
            line_ending: LineEnding::default(),
            datetime_format: DATETIME_FORMAT.to_string(),
            infer_schema_length: None,
        }
    }
}

impl CsvOptions {
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }
}
