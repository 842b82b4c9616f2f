//! Value-to-label recoding using catalog codings

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::catalog::{Coding, ResolvedColumns, VariableCatalog};
use crate::error::Result;
use crate::utils::arrow::{replace_column, string_column};
use crate::utils::logging::log_data_quality;

/// Map every value through `coding`.
///
/// Values without an entry become null, as do nulls. Returns the recoded
/// array and the number of non-null values that had no entry.
#[must_use]
pub fn recode_array(values: &StringArray, coding: &Coding) -> (StringArray, usize) {
    let mut unmapped = 0;
    let recoded = values
        .iter()
        .map(|value| {
            value.and_then(|v| {
                let label = coding.get(v).map(String::as_str);
                if label.is_none() {
                    unmapped += 1;
                }
                label
            })
        })
        .collect::<StringArray>();
    (recoded, unmapped)
}

/// Recode the surviving columns of every coded variable
///
/// Columns already consumed by indicator derivation are no longer part of
/// `resolved` and are left alone.
pub fn recode_variables(
    batch: &RecordBatch,
    catalog: &VariableCatalog,
    resolved: &ResolvedColumns,
) -> Result<RecordBatch> {
    let mut result = batch.clone();
    let mut lossy = Vec::new();

    for group in resolved.groups() {
        let Some(coding) = catalog.coding(&group.variable) else {
            continue;
        };

        for column in &group.columns {
            if result.schema().index_of(column).is_err() {
                continue;
            }
            let values = string_column(&result, column)?;
            let (recoded, unmapped) = recode_array(&values, coding);
            if unmapped > 0 {
                debug!("{unmapped} values of '{column}' have no label");
                lossy.push(column.clone());
            }
            let array: ArrayRef = Arc::new(recoded);
            result = replace_column(&result, column, array)?;
        }
    }

    if !lossy.is_empty() {
        log_data_quality("Values without a coding entry were set to missing", &lossy);
    }

    Ok(result)
}
