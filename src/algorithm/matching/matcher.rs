//! Core matching algorithm implementation
//!
//! This module implements the Matcher struct which orchestrates the matching process.

use std::time::Instant;

use arrow::record_batch::RecordBatch;
use log::{info, warn};
use rustc_hash::FxHashSet;

use crate::algorithm::matching::control_data::ControlData;
use crate::algorithm::matching::criteria::{ControlSelection, MatchingConfig};
use crate::algorithm::matching::extraction::{CONTROL, PATIENT, extract_covariates};
use crate::algorithm::matching::parallel::perform_parallel_matching;
use crate::algorithm::matching::sequential::perform_sequential_matching;
use crate::algorithm::matching::types::{MatchedPair, MatchingResult};
use crate::error::{CohortError, Result};
use crate::utils::arrow::take_rows;

/// Matcher for pairing every patient with one control
#[derive(Debug)]
pub struct Matcher {
    /// Matching configuration
    config: MatchingConfig,
    show_progress: bool,
}

impl Matcher {
    /// Create a new matcher with the given configuration
    #[must_use]
    pub const fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Draw progress bars while matching
    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Match each patient to its nearest control
    ///
    /// # Arguments
    ///
    /// * `patients` - `RecordBatch` containing the patient pool
    /// * `controls` - `RecordBatch` containing the eligible control pool
    /// * `id_column` - Subject id column shared by both pools
    ///
    /// # Returns
    ///
    /// The patients and a control batch of equal length, aligned by position
    pub fn perform_matching(
        &self,
        patients: &RecordBatch,
        controls: &RecordBatch,
        id_column: &str,
    ) -> Result<MatchingResult> {
        let start_time = Instant::now();
        let criteria = &self.config.criteria;

        let patient_covariates = extract_covariates(patients, id_column, criteria, PATIENT)?;
        let control_covariates = extract_covariates(controls, id_column, criteria, CONTROL)?;

        if patient_covariates.is_empty() {
            warn!("No patients to match");
        } else if control_covariates.is_empty() {
            return Err(CohortError::InsufficientControls {
                patients: patient_covariates.len(),
                controls: 0,
            });
        }

        info!(
            "Matching {} patients with control pool of {} candidates",
            patient_covariates.len(),
            control_covariates.len()
        );

        let control_data = ControlData::new(&control_covariates);

        let use_parallel = self.config.use_parallel
            && self.config.selection == ControlSelection::WithReplacement
            && patient_covariates.len() >= self.config.parallel_threshold;

        let neighbours = if use_parallel {
            perform_parallel_matching(&patient_covariates, &control_data, self.show_progress)?
        } else {
            perform_sequential_matching(
                &patient_covariates,
                &control_data,
                self.config.selection,
                self.show_progress,
            )?
        };

        let pairs: Vec<MatchedPair> = neighbours
            .iter()
            .enumerate()
            .map(|(patient_row, n)| MatchedPair {
                patient_id: patient_covariates.ids[patient_row].clone(),
                control_id: control_covariates.ids[n.control_row].clone(),
                patient_row,
                control_row: n.control_row,
                distance: n.distance,
            })
            .collect();

        let control_rows: Vec<usize> = pairs.iter().map(|p| p.control_row).collect();
        let matched_controls = take_rows(controls, &control_rows)?;

        if matched_controls.num_rows() != patients.num_rows() {
            return Err(CohortError::CardinalityMismatch {
                patients: patients.num_rows(),
                controls: matched_controls.num_rows(),
            });
        }

        let distinct_controls = control_rows.iter().collect::<FxHashSet<_>>().len();
        let elapsed = start_time.elapsed();

        let result = MatchingResult {
            patients: patients.clone(),
            matched_controls,
            pairs,
            distinct_controls,
            matching_time: elapsed,
        };

        info!(
            "Matching complete: {} patients matched with {} distinct controls in {:.2?}",
            result.patients.num_rows(),
            result.distinct_controls,
            elapsed
        );
        if let (Some(mean), Some(max)) = (result.mean_distance(), result.max_distance()) {
            info!("Covariate distance: mean {mean:.3}, max {max:.3}");
        }

        Ok(result)
    }
}
