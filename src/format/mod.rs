//! Wire constants and type tags of the dual-header convention.

mod tags;

pub use tags::{dtype_for_tag, is_supported, native_tag};

/// Name of the row-identifier column, always first on line 1.
pub const ROW_ID_COLUMN: &str = "Row ID";

/// Type tag written for the row-identifier position on line 2.
pub const INDEX_TAG: &str = "INDEX";

/// Timestamp layout used for data rows.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
