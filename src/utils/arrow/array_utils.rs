//! Utilities for working with Arrow arrays.
//!
//! This module provides helpers for looking up, downcasting, reading and
//! restructuring columns of the single `RecordBatch` the pipeline works on.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray, UInt32Array};
use arrow::compute::{filter_record_batch, take_record_batch};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use crate::error::{CohortError, Result};

/// Get the column index by name from a record batch
///
/// # Errors
/// Returns an error if the column does not exist
pub fn get_column_index(batch: &RecordBatch, column_name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(column_name)
        .map_err(|_| CohortError::column_not_found(column_name))
}

/// Get a column from a record batch by name
///
/// # Errors
/// Returns an error if the column does not exist
pub fn get_column_by_name(batch: &RecordBatch, column_name: &str) -> Result<ArrayRef> {
    let idx = get_column_index(batch, column_name)?;
    Ok(batch.column(idx).clone())
}

/// Downcast a column to a specific array type with clear error messages
///
/// # Arguments
///
/// * `array` - The array reference to downcast
/// * `column_name` - The name of the column (for error messages)
/// * `expected_type_name` - A human-readable name of the expected type (for error messages)
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| CohortError::InvalidDataType {
            column: column_name.to_string(),
            expected: expected_type_name.to_string(),
        })
}

/// Fetch a column and downcast it to a `StringArray`
pub fn string_column(batch: &RecordBatch, column_name: &str) -> Result<StringArray> {
    let array = get_column_by_name(batch, column_name)?;
    Ok(downcast_array::<StringArray>(&array, column_name, "Utf8")?.clone())
}

/// Fetch a column and downcast it to a `BooleanArray`
pub fn boolean_column(batch: &RecordBatch, column_name: &str) -> Result<BooleanArray> {
    let array = get_column_by_name(batch, column_name)?;
    Ok(downcast_array::<BooleanArray>(&array, column_name, "Boolean")?.clone())
}

/// Render a single cell as a string, `None` for nulls
pub fn cell_as_string(array: &ArrayRef, row: usize) -> Result<Option<String>> {
    if array.is_null(row) {
        return Ok(None);
    }
    if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        return Ok(Some(strings.value(row).to_string()));
    }
    Ok(Some(array_value_to_string(array, row)?))
}

/// Subject ids of a batch as owned strings, in row order
pub fn subject_ids(batch: &RecordBatch, id_column: &str) -> Result<Vec<String>> {
    let array = get_column_by_name(batch, id_column)?;
    (0..batch.num_rows())
        .map(|row| cell_as_string(&array, row).map(Option::unwrap_or_default))
        .collect()
}

/// Append columns to the end of a batch
pub fn append_columns(batch: &RecordBatch, columns: Vec<(String, ArrayRef)>) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

    for (name, array) in columns {
        if schema.index_of(&name).is_ok() {
            return Err(CohortError::Config(format!(
                "column '{name}' already exists"
            )));
        }
        fields.push(Arc::new(Field::new(name, array.data_type().clone(), true)));
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Replace the array (and field type) of an existing column
pub fn replace_column(batch: &RecordBatch, column_name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let idx = get_column_index(batch, column_name)?;
    let schema = batch.schema();
    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

    fields[idx] = Arc::new(Field::new(column_name, array.data_type().clone(), true));
    arrays[idx] = array;

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Remove the named columns; names not present are ignored
pub fn drop_columns(batch: &RecordBatch, column_names: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !column_names.iter().any(|c| c == f.name()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

/// Rename every column of a batch, positionally
pub fn rename_columns(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    if names.len() != batch.num_columns() {
        return Err(CohortError::SchemaMismatch {
            source_count: batch.num_columns(),
            output_count: names.len(),
            detail: "cannot rename columns positionally".to_string(),
        });
    }
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(names)
        .map(|(field, name)| Field::new(name, field.data_type().clone(), true))
        .collect();
    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        batch.columns().to_vec(),
    )?)
}

/// Keep only the rows where `mask` is true
pub fn filter_rows(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(CohortError::Config(format!(
            "mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }
    Ok(filter_record_batch(batch, mask)?)
}

/// Gather rows by position; positions may repeat
pub fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let indices = UInt32Array::from_iter_values(indices.iter().map(|&i| i as u32));
    Ok(take_record_batch(batch, &indices)?)
}
