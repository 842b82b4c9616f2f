//! Split of the classified population into patient and control pools

use arrow::array::{Array, BooleanArray, StringArray};
use arrow::record_batch::RecordBatch;
use log::info;

use crate::algorithm::health::DiagnosisCategory;
use crate::error::{CohortError, Result};
use crate::utils::arrow::{boolean_column, filter_rows, string_column, subject_ids};

/// Patient and control pools drawn from one table
#[derive(Debug, Clone)]
pub struct CohortPartition {
    /// Subjects whose category is a patient category
    pub patients: RecordBatch,
    /// Subjects without any mental disorder
    pub controls: RecordBatch,
    /// Subjects in neither pool
    pub unassigned: usize,
}

/// Split `batch` into patients and eligible controls.
///
/// A patient has a category from `patient_categories` in `category_column`;
/// an eligible control has `mental_disorder_column` false. Nulls in the
/// indicator count as false.
///
/// # Errors
/// Returns an error if a subject qualifies for both pools.
pub fn partition(
    batch: &RecordBatch,
    id_column: &str,
    category_column: &str,
    mental_disorder_column: &str,
    patient_categories: &[DiagnosisCategory],
) -> Result<CohortPartition> {
    let categories: StringArray = string_column(batch, category_column)?;
    let mental = boolean_column(batch, mental_disorder_column)?;

    let labels: Vec<&str> = patient_categories.iter().map(|c| c.label()).collect();
    let is_patient: Vec<bool> = (0..batch.num_rows())
        .map(|row| categories.is_valid(row) && labels.contains(&categories.value(row)))
        .collect();
    let is_control: Vec<bool> = (0..batch.num_rows())
        .map(|row| !(mental.is_valid(row) && mental.value(row)))
        .collect();

    if let Some(row) = (0..batch.num_rows()).find(|&row| is_patient[row] && is_control[row]) {
        let ids = subject_ids(batch, id_column)?;
        return Err(CohortError::Config(format!(
            "subject '{}' is both a patient and a control; \
             patient categories must imply '{mental_disorder_column}'",
            ids[row]
        )));
    }

    let patient_count = is_patient.iter().filter(|&&p| p).count();
    let control_count = is_control.iter().filter(|&&c| c).count();
    let patients = filter_rows(batch, &BooleanArray::from(is_patient))?;
    let controls = filter_rows(batch, &BooleanArray::from(is_control))?;
    let unassigned = batch.num_rows() - patient_count - control_count;

    info!(
        "Partitioned {} subjects: {patient_count} patients, {control_count} eligible controls, {unassigned} unassigned",
        batch.num_rows()
    );

    Ok(CohortPartition {
        patients,
        controls,
        unassigned,
    })
}
