//! Composite diagnosis categories
//!
//! Subjects are assigned a single category from their four diagnosis
//! indicators. Rules are evaluated in order; the first match wins:
//!
//! | anySSD | anyMoodDisorder | anyDementia | anyMentalDisorder | category              |
//! |--------|-----------------|-------------|-------------------|-----------------------|
//! | true   | false           | any         | any               | Only SSD              |
//! | false  | true            | any         | any               | Only Mood Disorder    |
//! | true   | true            | any         | any               | SSD + Mood Disorder   |
//! | false  | false           | false       | false             | none                  |
//!
//! Anything else is outside the table. [`ClassificationMode::Strict`] treats
//! it as a fatal inconsistency; [`ClassificationMode::Extended`] assigns the
//! `Dementia` or `Other Mental Disorder` categories instead.

use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray};
use arrow::record_batch::RecordBatch;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::DiagnosisColumns;
use crate::error::{CohortError, Result};
use crate::utils::arrow::{boolean_column, subject_ids};

/// Diagnosis categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosisCategory {
    /// Schizophrenia spectrum disorder without mood disorder
    #[serde(rename = "Only SSD")]
    OnlySsd,
    /// Mood disorder without schizophrenia spectrum disorder
    #[serde(rename = "Only Mood Disorder")]
    OnlyMoodDisorder,
    /// Both schizophrenia spectrum and mood disorder
    #[serde(rename = "SSD + Mood Disorder")]
    SsdAndMoodDisorder,
    /// Mental disorder other than SSD or mood disorder (extended mode only)
    #[serde(rename = "Other Mental Disorder")]
    OtherMentalDisorder,
    /// Dementia without SSD or mood disorder (extended mode only)
    #[serde(rename = "Dementia")]
    Dementia,
}

impl DiagnosisCategory {
    /// Get the label written to the output table
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnlySsd => "Only SSD",
            Self::OnlyMoodDisorder => "Only Mood Disorder",
            Self::SsdAndMoodDisorder => "SSD + Mood Disorder",
            Self::OtherMentalDisorder => "Other Mental Disorder",
            Self::Dementia => "Dementia",
        }
    }

    /// Parse a label back into a category
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all_categories()
            .into_iter()
            .find(|c| c.label() == label)
    }

    /// Categories that make a subject a patient by default
    #[must_use]
    pub const fn patient_categories() -> [Self; 3] {
        [
            Self::OnlySsd,
            Self::OnlyMoodDisorder,
            Self::SsdAndMoodDisorder,
        ]
    }

    /// All categories
    #[must_use]
    pub fn all_categories() -> Vec<Self> {
        vec![
            Self::OnlySsd,
            Self::OnlyMoodDisorder,
            Self::SsdAndMoodDisorder,
            Self::OtherMentalDisorder,
            Self::Dementia,
        ]
    }
}

impl fmt::Display for DiagnosisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How combinations outside the decision table are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Abort on any combination outside the decision table
    #[default]
    Strict,
    /// Assign `Dementia` / `Other Mental Disorder` instead of aborting
    Extended,
}

/// The four indicators one subject is classified from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosisIndicators {
    pub any_ssd: bool,
    pub any_mood_disorder: bool,
    pub any_dementia: bool,
    pub any_mental_disorder: bool,
}

/// Classify one subject.
///
/// `subject` is only used to identify the subject in the error.
///
/// # Errors
/// Returns [`CohortError::Classification`] in strict mode when the
/// combination falls outside the decision table.
pub fn classify(
    subject: &str,
    indicators: &DiagnosisIndicators,
    mode: ClassificationMode,
) -> Result<Option<DiagnosisCategory>> {
    let DiagnosisIndicators {
        any_ssd,
        any_mood_disorder,
        any_dementia,
        any_mental_disorder,
    } = *indicators;

    match (any_ssd, any_mood_disorder) {
        (true, false) => return Ok(Some(DiagnosisCategory::OnlySsd)),
        (false, true) => return Ok(Some(DiagnosisCategory::OnlyMoodDisorder)),
        (true, true) => return Ok(Some(DiagnosisCategory::SsdAndMoodDisorder)),
        (false, false) => {}
    }

    if !any_dementia && !any_mental_disorder {
        return Ok(None);
    }

    match mode {
        ClassificationMode::Extended if any_dementia => Ok(Some(DiagnosisCategory::Dementia)),
        ClassificationMode::Extended => Ok(Some(DiagnosisCategory::OtherMentalDisorder)),
        ClassificationMode::Strict => Err(CohortError::Classification {
            subject: subject.to_string(),
            any_ssd,
            any_mood_disorder,
            any_dementia,
            any_mental_disorder,
        }),
    }
}

/// Read an indicator column, treating nulls as false.
///
/// A missing dementia column is read as all false, since dementia subjects are
/// usually excluded (and the column dropped) before classification.
fn indicator_values(batch: &RecordBatch, column: &str, optional: bool) -> Result<Vec<bool>> {
    if optional && batch.schema().index_of(column).is_err() {
        return Ok(vec![false; batch.num_rows()]);
    }
    let values: BooleanArray = boolean_column(batch, column)?;
    Ok((0..values.len())
        .map(|i| values.is_valid(i) && values.value(i))
        .collect())
}

/// Classify every row of a table, returning the category label column
pub fn classify_batch(
    batch: &RecordBatch,
    id_column: &str,
    columns: &DiagnosisColumns,
    mode: ClassificationMode,
) -> Result<ArrayRef> {
    let ids = subject_ids(batch, id_column)?;
    let ssd = indicator_values(batch, &columns.any_ssd, false)?;
    let mood = indicator_values(batch, &columns.any_mood_disorder, false)?;
    let dementia = indicator_values(batch, &columns.any_dementia, true)?;
    let mental = indicator_values(batch, &columns.any_mental_disorder, false)?;

    let mut counts: FxHashMap<Option<DiagnosisCategory>, usize> = FxHashMap::default();
    let categories = ids
        .iter()
        .enumerate()
        .map(|(row, id)| {
            let indicators = DiagnosisIndicators {
                any_ssd: ssd[row],
                any_mood_disorder: mood[row],
                any_dementia: dementia[row],
                any_mental_disorder: mental[row],
            };
            let category = classify(id, &indicators, mode)?;
            *counts.entry(category).or_default() += 1;
            Ok(category.map(DiagnosisCategory::label))
        })
        .collect::<Result<Vec<_>>>()?;

    for category in DiagnosisCategory::all_categories() {
        if let Some(count) = counts.get(&Some(category)) {
            info!("{category}: {count} subjects");
        }
    }
    info!(
        "Without diagnosis category: {} subjects",
        counts.get(&None).copied().unwrap_or(0)
    );

    Ok(Arc::new(StringArray::from(categories)))
}
