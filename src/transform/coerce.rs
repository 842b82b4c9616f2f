//! Numeric coercion of text columns

use arrow::array::Array;
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::Result;
use crate::utils::arrow::replace_column;

/// Convert every text column whose non-null values all parse as numbers.
///
/// Integer-valued columns become `Int64`, other numeric columns `Float64`.
/// Columns with any non-numeric value, columns without values, and the
/// columns named in `keep_as_text` are left unchanged.
pub fn coerce_numeric(batch: &RecordBatch, keep_as_text: &[&str]) -> Result<RecordBatch> {
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };

    let mut result = batch.clone();
    let schema = batch.schema();
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        if field.data_type() != &DataType::Utf8
            || keep_as_text.contains(&field.name().as_str())
            || array.null_count() == array.len()
        {
            continue;
        }

        let converted = cast_with_options(array, &DataType::Int64, &strict)
            .or_else(|_| cast_with_options(array, &DataType::Float64, &strict));

        if let Ok(numeric) = converted {
            debug!("Column '{}' coerced to {}", field.name(), numeric.data_type());
            result = replace_column(&result, field.name(), numeric)?;
        }
    }

    Ok(result)
}
