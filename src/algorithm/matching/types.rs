//! Type definitions for the matching algorithm
//!
//! This module contains common types used throughout the matching algorithm.

use std::time::Duration;

use arrow::record_batch::RecordBatch;

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Patients, in input order
    pub patients: RecordBatch,
    /// One control row per patient row, aligned by position
    pub matched_controls: RecordBatch,
    /// Patient-control pairs, aligned with the two batches
    pub pairs: Vec<MatchedPair>,
    /// Number of distinct controls used
    pub distinct_controls: usize,
    /// Time taken for matching
    pub matching_time: Duration,
}

impl MatchingResult {
    /// Mean patient-control distance, `None` without pairs
    #[must_use]
    pub fn mean_distance(&self) -> Option<f64> {
        if self.pairs.is_empty() {
            return None;
        }
        Some(self.pairs.iter().map(|p| p.distance).sum::<f64>() / self.pairs.len() as f64)
    }

    /// Largest patient-control distance, `None` without pairs
    #[must_use]
    pub fn max_distance(&self) -> Option<f64> {
        self.pairs.iter().map(|p| p.distance).reduce(f64::max)
    }
}

/// Pair of matched patient and control
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub patient_id: String,
    pub control_id: String,
    /// Row of the patient in the patient pool
    pub patient_row: usize,
    /// Row of the control in the control pool
    pub control_row: usize,
    /// Euclidean covariate distance
    pub distance: f64,
}

/// Matching covariates extracted from a pool, in row order
#[derive(Debug, Clone, Default)]
pub struct ExtractedCovariates {
    pub ids: Vec<String>,
    pub ages: Vec<f64>,
    /// 1.0 for the positive sex label, 0.0 otherwise
    pub sexes: Vec<f64>,
}

impl ExtractedCovariates {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nearest control found for one patient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    /// Row of the control in the control pool
    pub control_row: usize,
    pub distance: f64,
}
