//! Arrow data handling utilities
//!
//! Helpers for column lookup, downcasting and restructuring of the working
//! `RecordBatch`.

pub mod array_utils;

pub use array_utils::{
    append_columns, boolean_column, cell_as_string, downcast_array, drop_columns, filter_rows,
    get_column_by_name, get_column_index, rename_columns, replace_column, string_column,
    subject_ids, take_rows,
};
