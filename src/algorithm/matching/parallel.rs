//! Parallel matching implementation
//!
//! With replacement every patient's search is independent, so large patient
//! pools are matched with Rayon. Results keep patient order.

use log::info;
use rayon::prelude::*;

use crate::algorithm::matching::control_data::ControlData;
use crate::algorithm::matching::types::{ExtractedCovariates, Neighbour};
use crate::error::{CohortError, Result};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Find the nearest control for every patient in parallel (with replacement)
pub fn perform_parallel_matching(
    patients: &ExtractedCovariates,
    control_data: &ControlData,
    show_progress: bool,
) -> Result<Vec<Neighbour>> {
    let num_threads = rayon::current_num_threads();
    info!(
        "Using parallel processing with {num_threads} threads for {} patients",
        patients.len()
    );

    let pb = create_main_progress_bar(
        patients.len() as u64,
        Some("Matching patients with controls"),
        show_progress,
    );

    let neighbours = patients
        .ages
        .par_iter()
        .zip(patients.sexes.par_iter())
        .map(|(&age, &sex)| {
            let found = control_data.nearest(age, sex, None).map(|(_, n)| n);
            pb.inc(1);
            found
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(CohortError::InsufficientControls {
            patients: patients.len(),
            controls: control_data.len(),
        })?;

    finish_progress_bar(&pb, Some("Matching complete"));
    Ok(neighbours)
}
