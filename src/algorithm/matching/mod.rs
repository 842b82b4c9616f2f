//! Case-control matching for cohort construction
//!
//! This module pairs every patient with its nearest control in the space of
//! age and binary sex. It includes:
//!
//! 1. Matching criteria and configuration
//! 2. A sorted nearest-neighbour index over the control pool
//! 3. Sequential and Rayon-parallel matching drivers
//!
//! Matching is deterministic: ties resolve to the control that comes first in
//! the control pool.

pub mod control_data;
pub mod criteria;
pub mod extraction;
pub mod matcher;
pub mod parallel;
pub mod sequential;
pub mod types;

// Re-export key types
pub use control_data::ControlData;
pub use criteria::{
    ControlSelection, MatchingConfig, MatchingConfigBuilder, MatchingCriteria,
    MatchingCriteriaBuilder,
};
pub use matcher::Matcher;
pub use types::{ExtractedCovariates, MatchedPair, MatchingResult, Neighbour};
