//! Control data structure for the matching algorithm
//!
//! Struct-of-arrays nearest-neighbour index over the control pool. Controls
//! are sorted by age so a search can start at the patient's age and walk
//! outwards, stopping once the age gap alone exceeds the best distance.

use crate::algorithm::matching::types::{ExtractedCovariates, Neighbour};

/// Age-sorted control covariates
#[derive(Debug, Clone)]
pub struct ControlData {
    ages: Vec<f64>,
    sexes: Vec<f64>,
    /// Row of each sorted entry in the control pool
    rows: Vec<usize>,
}

impl ControlData {
    /// Build the index from control covariates in pool order
    #[must_use]
    pub fn new(controls: &ExtractedCovariates) -> Self {
        let mut order: Vec<usize> = (0..controls.len()).collect();
        // Stable, so equal ages keep pool order
        order.sort_by(|&a, &b| controls.ages[a].total_cmp(&controls.ages[b]));

        Self {
            ages: order.iter().map(|&i| controls.ages[i]).collect(),
            sexes: order.iter().map(|&i| controls.sexes[i]).collect(),
            rows: order,
        }
    }

    /// Get the number of controls
    #[must_use]
    pub fn len(&self) -> usize {
        self.ages.len()
    }

    /// Check if the control data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Nearest control to `(age, sex)`.
    ///
    /// Entries flagged in `used` (indexed by sorted position) are skipped.
    /// Equal distances resolve to the control earliest in the pool, so the
    /// result is identical to an exhaustive scan.
    #[must_use]
    pub fn nearest(&self, age: f64, sex: f64, used: Option<&[bool]>) -> Option<(usize, Neighbour)> {
        let start = self.ages.partition_point(|&a| a < age);
        let mut best: Option<(usize, Neighbour)> = None;

        let consider = |pos: usize, best: &mut Option<(usize, Neighbour)>| {
            if used.is_some_and(|u| u[pos]) {
                return;
            }
            let age_gap = self.ages[pos] - age;
            let sex_gap = self.sexes[pos] - sex;
            let candidate = Neighbour {
                control_row: self.rows[pos],
                distance: age_gap.hypot(sex_gap),
            };
            let better = match best {
                None => true,
                Some((_, current)) => {
                    candidate.distance < current.distance
                        || (candidate.distance == current.distance
                            && candidate.control_row < current.control_row)
                }
            };
            if better {
                *best = Some((pos, candidate));
            }
        };

        let exceeds = |gap: f64, best: &Option<(usize, Neighbour)>| {
            best.is_some_and(|(_, current)| gap > current.distance)
        };

        for pos in start..self.len() {
            if exceeds(self.ages[pos] - age, &best) {
                break;
            }
            consider(pos, &mut best);
        }
        for pos in (0..start).rev() {
            if exceeds(age - self.ages[pos], &best) {
                break;
            }
            consider(pos, &mut best);
        }

        best
    }
}
