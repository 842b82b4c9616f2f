//! Population selection for cohort construction
//!
//! This module provides the row filters (exclusion, inclusion, completeness)
//! and the split of the classified population into patients and controls.

pub mod filters;
pub mod partition;

pub use filters::{BatchFilter, CompletenessFilter, ExclusionFilter, InclusionPredicate};
pub use partition::{CohortPartition, partition};
