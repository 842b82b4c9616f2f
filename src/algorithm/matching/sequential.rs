//! Sequential matching implementation
//!
//! Patients are processed in input order. Without replacement, each control
//! is claimed by the first patient it is nearest to.

use log::info;

use crate::algorithm::matching::control_data::ControlData;
use crate::algorithm::matching::criteria::ControlSelection;
use crate::algorithm::matching::types::{ExtractedCovariates, Neighbour};
use crate::error::{CohortError, Result};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Find a control for every patient, one at a time
pub fn perform_sequential_matching(
    patients: &ExtractedCovariates,
    control_data: &ControlData,
    selection: ControlSelection,
    show_progress: bool,
) -> Result<Vec<Neighbour>> {
    info!("Using sequential processing for {} patients", patients.len());

    let pb = create_main_progress_bar(
        patients.len() as u64,
        Some("Sequential matching"),
        show_progress,
    );

    let mut used = match selection {
        ControlSelection::WithReplacement => None,
        ControlSelection::WithoutReplacement => Some(vec![false; control_data.len()]),
    };

    let mut neighbours = Vec::with_capacity(patients.len());
    for (age, sex) in patients.ages.iter().zip(&patients.sexes) {
        let (pos, neighbour) = control_data
            .nearest(*age, *sex, used.as_deref())
            .ok_or(CohortError::InsufficientControls {
                patients: patients.len(),
                controls: control_data.len(),
            })?;

        if let Some(used) = used.as_mut() {
            used[pos] = true;
        }
        neighbours.push(neighbour);
        pb.inc(1);
    }

    finish_progress_bar(&pb, Some("Matching complete"));
    Ok(neighbours)
}
