//! Delimited table utilities.

mod reader;

pub use reader::{
    has_column, optional_string_values, read_delimited_table, require_columns, string_values,
    validate_encoding,
};
