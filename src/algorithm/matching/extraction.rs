//! Covariate extraction for the matching algorithm
//!
//! This module reads the matching covariates of a patient or control pool
//! into plain vectors.

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::criteria::MatchingCriteria;
use crate::algorithm::matching::types::ExtractedCovariates;
use crate::error::{CohortError, Result};
use crate::utils::arrow::{cell_as_string, downcast_array, get_column_by_name, subject_ids};

/// Which pool a subject belongs to, for error reporting
pub const PATIENT: &str = "patient";
pub const CONTROL: &str = "control";

fn as_float(array: &ArrayRef, column: &str) -> Result<Float64Array> {
    let values = cast(array, &DataType::Float64)?;
    Ok(downcast_array::<Float64Array>(&values, column, "Float64")?.clone())
}

/// Binary sex codes; `None` where the value is missing
fn sex_codes(array: &ArrayRef, column: &str, positive: &str) -> Result<Vec<Option<f64>>> {
    if array.data_type().is_numeric() {
        let target = positive.trim().parse::<f64>().ok();
        let values = as_float(array, column)?;
        return Ok(values
            .iter()
            .map(|v| v.map(|v| if Some(v) == target { 1.0 } else { 0.0 }))
            .collect());
    }

    (0..array.len())
        .map(|row| {
            Ok(cell_as_string(array, row)?.map(|v| if v == positive { 1.0 } else { 0.0 }))
        })
        .collect()
}

/// Extract age and sex for every row of `batch`.
///
/// Ages that cannot be read as finite numbers count as missing.
///
/// # Errors
/// Returns [`CohortError::MissingCovariate`] for the first subject lacking
/// either covariate.
pub fn extract_covariates(
    batch: &RecordBatch,
    id_column: &str,
    criteria: &MatchingCriteria,
    role: &'static str,
) -> Result<ExtractedCovariates> {
    let ids = subject_ids(batch, id_column)?;
    let ages = as_float(
        &get_column_by_name(batch, &criteria.age_column)?,
        &criteria.age_column,
    )?;
    let sex_array = get_column_by_name(batch, &criteria.sex_column)?;
    let sexes = sex_codes(&sex_array, &criteria.sex_column, &criteria.sex_positive_label)?;

    let missing = |subject: &str, covariate: &str| CohortError::MissingCovariate {
        subject: subject.to_string(),
        role,
        covariate: covariate.to_string(),
    };

    let mut extracted = ExtractedCovariates {
        ids: Vec::with_capacity(ids.len()),
        ages: Vec::with_capacity(ids.len()),
        sexes: Vec::with_capacity(ids.len()),
    };

    for (row, id) in ids.into_iter().enumerate() {
        let age = ages
            .is_valid(row)
            .then(|| ages.value(row))
            .filter(|a| a.is_finite())
            .ok_or_else(|| missing(&id, &criteria.age_column))?;
        let sex = sexes[row].ok_or_else(|| missing(&id, &criteria.sex_column))?;

        extracted.ids.push(id);
        extracted.ages.push(age);
        extracted.sexes.push(sex);
    }

    Ok(extracted)
}
