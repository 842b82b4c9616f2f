//! A Rust library for building matched case-control cohorts from
//! biobank-style CSV extracts.
//!
//! A [`VariableCatalog`] declares which extract fields to read. The
//! [`CohortPipeline`] derives diagnosis indicators, recodes and coerces
//! values, classifies subjects into diagnosis categories, and pairs every
//! patient with the nearest control on age and sex.

pub mod algorithm;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod transform;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use catalog::{ColumnResolver, IndexRange, ResolvedColumns, VariableCatalog, VariableSpec};
pub use config::{DerivedFeature, IndicatorGroup, IndicatorRule, PipelineConfig};
pub use error::{CohortError, Result};
pub use pipeline::{CohortPipeline, CohortTable};

// Algorithms
pub use algorithm::health::{ClassificationMode, DiagnosisCategory};
pub use algorithm::matching::{ControlSelection, MatchingConfig, MatchingCriteria};
pub use algorithm::population::InclusionPredicate;

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Dataset files
pub use utils::io::{latest_dataset, load_latest};
