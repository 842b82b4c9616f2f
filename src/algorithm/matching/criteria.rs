//! Matching criteria definitions for case-control matching
//!
//! This module defines which covariates patients and controls are matched on
//! and how the control pool is drawn from.

use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};

/// Covariates used to measure patient-control distance
///
/// Subjects are placed in a two-dimensional space of age and a binary sex
/// code (1 for `sex_positive_label`, 0 otherwise); distance is Euclidean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingCriteria {
    /// Numeric age column
    pub age_column: String,
    /// Sex column, after recoding
    pub sex_column: String,
    /// Value of `sex_column` encoded as 1
    pub sex_positive_label: String,
}

impl Default for MatchingCriteria {
    fn default() -> Self {
        Self {
            age_column: "age".to_string(),
            sex_column: "sex".to_string(),
            sex_positive_label: "Female".to_string(),
        }
    }
}

impl MatchingCriteria {
    /// Create a new instance with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching criteria
    #[must_use]
    pub fn builder() -> MatchingCriteriaBuilder {
        MatchingCriteriaBuilder::new()
    }

    /// Columns read during matching
    #[must_use]
    pub fn required_columns(&self) -> [&str; 2] {
        [self.age_column.as_str(), self.sex_column.as_str()]
    }
}

/// Builder for constructing matching criteria
#[derive(Debug, Clone, Default)]
pub struct MatchingCriteriaBuilder {
    criteria: MatchingCriteria,
}

impl MatchingCriteriaBuilder {
    /// Create a new builder with default criteria
    #[must_use]
    pub fn new() -> Self {
        Self {
            criteria: MatchingCriteria::default(),
        }
    }

    /// Set the age column
    #[must_use]
    pub fn age_column(mut self, column: impl Into<String>) -> Self {
        self.criteria.age_column = column.into();
        self
    }

    /// Set the sex column
    #[must_use]
    pub fn sex_column(mut self, column: impl Into<String>) -> Self {
        self.criteria.sex_column = column.into();
        self
    }

    /// Set the sex value encoded as 1
    #[must_use]
    pub fn sex_positive_label(mut self, label: impl Into<String>) -> Self {
        self.criteria.sex_positive_label = label.into();
        self
    }

    /// Build the matching criteria
    #[must_use]
    pub fn build(self) -> MatchingCriteria {
        self.criteria
    }
}

/// How controls are drawn from the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSelection {
    /// Every patient gets its nearest control; a control may serve several patients
    #[default]
    WithReplacement,
    /// Each control is used at most once, assigned greedily in patient order
    WithoutReplacement,
}

/// Configuration for the matching process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// The criteria to use for matching
    pub criteria: MatchingCriteria,

    /// Control selection policy
    pub selection: ControlSelection,

    /// Whether to use parallel processing for matching
    pub use_parallel: bool,

    /// Minimum number of patients before matching runs in parallel
    pub parallel_threshold: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            criteria: MatchingCriteria::default(),
            selection: ControlSelection::default(),
            use_parallel: true,
            parallel_threshold: 1000,
        }
    }
}

impl MatchingConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching configuration
    #[must_use]
    pub fn builder() -> MatchingConfigBuilder {
        MatchingConfigBuilder::new()
    }

    /// Check that the covariate columns are named
    pub fn validate(&self) -> Result<()> {
        if self
            .criteria
            .required_columns()
            .iter()
            .any(|c| c.is_empty())
        {
            return Err(CohortError::Config(
                "matching covariate columns must be named".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing matching configuration
#[derive(Debug, Clone, Default)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl MatchingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Set the matching criteria
    #[must_use]
    pub fn criteria(mut self, criteria: MatchingCriteria) -> Self {
        self.config.criteria = criteria;
        self
    }

    /// Set the control selection policy
    #[must_use]
    pub const fn selection(mut self, selection: ControlSelection) -> Self {
        self.config.selection = selection;
        self
    }

    /// Set whether to use parallel processing
    #[must_use]
    pub const fn use_parallel(mut self, parallel: bool) -> Self {
        self.config.use_parallel = parallel;
        self
    }

    /// Set the patient count above which matching runs in parallel
    #[must_use]
    pub const fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    /// Build the matching configuration
    #[must_use]
    pub fn build(self) -> MatchingConfig {
        self.config
    }
}
