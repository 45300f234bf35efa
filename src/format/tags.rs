//! Type tag <-> polars dtype mapping.

use polars::prelude::{DataType, TimeUnit};

/// Resolve a declared type tag from line 2 into the dtype it asks for.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// Unknown tags yield `None`.
pub fn dtype_for_tag(tag: &str) -> Option<DataType> {
    let tag = tag.trim().to_ascii_lowercase();
    let dtype = match tag.as_str() {
        "object" | "str" | "string" => DataType::String,
        "bool" | "boolean" => DataType::Boolean,
        "float" | "float64" | "double" => DataType::Float64,
        "float32" => DataType::Float32,
        "int" | "int64" => DataType::Int64,
        "int32" => DataType::Int32,
        "int16" => DataType::Int16,
        "int8" => DataType::Int8,
        "uint64" => DataType::UInt64,
        "uint32" => DataType::UInt32,
        "uint16" => DataType::UInt16,
        "uint8" => DataType::UInt8,
        "datetime" | "datetime64" | "datetime64[ns]" => {
            DataType::Datetime(TimeUnit::Nanoseconds, None)
        }
        "datetime64[us]" => DataType::Datetime(TimeUnit::Microseconds, None),
        "datetime64[ms]" => DataType::Datetime(TimeUnit::Milliseconds, None),
        _ => return None,
    };
    Some(dtype)
}

/// Native type name written on line 2 for a column of `dtype`.
///
/// Returns `None` for dtypes the convention cannot carry, including
/// timezone-aware timestamps.
pub fn native_tag(dtype: &DataType) -> Option<&'static str> {
    let tag = match dtype {
        DataType::String => "object",
        DataType::Boolean => "bool",
        DataType::Float64 => "float64",
        DataType::Float32 => "float32",
        DataType::Int64 => "int64",
        DataType::Int32 => "int32",
        DataType::Int16 => "int16",
        DataType::Int8 => "int8",
        DataType::UInt64 => "uint64",
        DataType::UInt32 => "uint32",
        DataType::UInt16 => "uint16",
        DataType::UInt8 => "uint8",
        DataType::Datetime(unit, None) => match unit {
            TimeUnit::Nanoseconds => "datetime64[ns]",
            TimeUnit::Microseconds => "datetime64[us]",
            TimeUnit::Milliseconds => "datetime64[ms]",
        },
        _ => return None,
    };
    Some(tag)
}

/// Whether a column of `dtype` can be written.
pub fn is_supported(dtype: &DataType) -> bool {
    native_tag(dtype).is_some()
}
