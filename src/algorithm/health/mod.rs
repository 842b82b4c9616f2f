//! Health data processing algorithms
//!
//! This module derives diagnosis indicators from array variables and
//! assigns the composite diagnosis category used to define patients.

pub mod diagnosis;
pub mod indicators;

pub use diagnosis::{
    ClassificationMode, DiagnosisCategory, DiagnosisIndicators, classify, classify_batch,
};
pub use indicators::{IndicatorDeriver, apply_indicator_group};
