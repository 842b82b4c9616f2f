//! Error handling for the cohort pipeline.
//!
//! Internal integrity violations (schema, derivation, classification, matching
//! cardinality) abort a run. Data-quality gaps such as unmapped codes or empty
//! array slots are absorbed as nulls and never surface here.

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;

/// Error type for every stage of cohort construction
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    /// Catalog expansion produced source and output column lists that do not line up
    #[error("Schema mismatch: {source_count} source columns vs {output_count} output columns ({detail})")]
    SchemaMismatch {
        source_count: usize,
        output_count: usize,
        detail: String,
    },

    /// Indicator derivation produced an inconsistent number of cells
    #[error("Derivation integrity violated for '{group}': produced {produced} cells, expected {expected}")]
    DerivationIntegrity {
        group: String,
        produced: usize,
        expected: usize,
    },

    /// Indicator combination outside the diagnosis decision table
    #[error(
        "Unclassifiable diagnosis combination for subject '{subject}': \
         anySSD={any_ssd}, anyMoodDisorder={any_mood_disorder}, \
         anyDementia={any_dementia}, anyMentalDisorder={any_mental_disorder}"
    )]
    Classification {
        subject: String,
        any_ssd: bool,
        any_mood_disorder: bool,
        any_dementia: bool,
        any_mental_disorder: bool,
    },

    /// A patient or control lacks a matching covariate
    #[error("Subject '{subject}' ({role}) is missing matching covariate '{covariate}'")]
    MissingCovariate {
        subject: String,
        role: &'static str,
        covariate: String,
    },

    /// The control pool cannot supply a match
    #[error("Control pool exhausted: {patients} patients but only {controls} eligible controls")]
    InsufficientControls { patients: usize, controls: usize },

    /// Matching produced a different number of controls than patients
    #[error("Matched cohort is unbalanced: {patients} patients vs {controls} controls")]
    CardinalityMismatch { patients: usize, controls: usize },

    /// Column missing from a table or extract header
    #[error("Column '{column}' not found")]
    ColumnNotFound { column: String },

    /// Column present but with an unexpected Arrow type
    #[error("Column '{column}' is not a {expected} array")]
    InvalidDataType { column: String, expected: String },

    /// Indicator rule pattern failed to compile
    #[error("Invalid pattern for indicator '{indicator}': {source}")]
    InvalidPattern {
        indicator: String,
        #[source]
        source: regex::Error,
    },

    /// Malformed variable catalog
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Malformed pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No dated dataset in the output directory
    #[error("Could not find an existing dataset in {}", .0.display())]
    NoDatasetFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CohortError {
    /// Create a column not found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Whether this error signals an internal integrity violation rather than bad input
    #[must_use]
    pub const fn is_fatal_integrity(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. }
                | Self::DerivationIntegrity { .. }
                | Self::Classification { .. }
                | Self::CardinalityMismatch { .. }
        )
    }
}

/// Result type for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;
