//! Configuration for the cohort pipeline.
//!
//! Everything that was hard-wired in earlier study scripts (id columns,
//! indicator patterns, exclusion rules, matching covariates) lives in
//! [`PipelineConfig`], which is passed explicitly into the pipeline.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::algorithm::health::diagnosis::{ClassificationMode, DiagnosisCategory};
use crate::algorithm::matching::MatchingConfig;
use crate::algorithm::population::InclusionPredicate;
use crate::error::{CohortError, Result};

/// Derived boolean indicator: true when `pattern` matches any slot value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRule {
    pub name: String,
    pub pattern: String,
}

impl IndicatorRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Indicator rules evaluated over the array columns of one catalog variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorGroup {
    /// Catalog variable whose array slots are scanned
    pub variable: String,
    pub rules: Vec<IndicatorRule>,
    /// Remove the slot columns once the indicators are derived
    #[serde(default)]
    pub drop_target: bool,
    /// Match patterns against coded labels instead of raw values
    #[serde(default)]
    pub match_labels: bool,
}

impl IndicatorGroup {
    /// ICD-10 diagnosis indicators used by the cohort definition
    #[must_use]
    pub fn icd10_diagnoses(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            rules: vec![
                IndicatorRule::new("anySSD", r"F2\d"),
                IndicatorRule::new("anyMoodDisorder", r"F3\d"),
                IndicatorRule::new("anyDementia", r"F0\d"),
                IndicatorRule::new("anyMentalDisorder", r"F\d"),
            ],
            drop_target: true,
            match_labels: false,
        }
    }

    /// Highest-qualification indicators, matched on the coded labels
    #[must_use]
    pub fn education_levels(variable: impl Into<String>) -> Self {
        let levels = [
            ("EduNoneOfTheAbove", "None of the above"),
            ("EduDeclineToAnswer", "Prefer not to answer"),
            ("EduUniversityDegree", "College or University degree"),
            ("EduALevelsOrEq", "A levels/AS levels or equivalent"),
            ("EduOLevelsOrEq", "O levels/GCSEs or equivalent"),
            ("EduCSEOrEq", "CSEs or equivalent"),
            ("EduNVQOrEq", "NVQ or HND or HNC or equivalent"),
            (
                "EduOtherProfQual",
                "Other professional qualifications eg: nursing, teaching",
            ),
        ];
        Self {
            variable: variable.into(),
            rules: levels
                .iter()
                .map(|(name, label)| IndicatorRule::new(*name, regex::escape(label)))
                .collect(),
            drop_target: true,
            match_labels: true,
        }
    }
}

/// Column computed from other columns after numeric coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedFeature {
    /// Row-wise sum; null if any source is null
    Sum {
        name: String,
        sources: Vec<String>,
        #[serde(default)]
        drop_sources: bool,
    },
    /// `numerator / denominator`; null on a null side or a zero denominator
    Ratio {
        name: String,
        numerator: String,
        denominator: String,
    },
}

impl DerivedFeature {
    /// Name of the produced column
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Sum { name, .. } | Self::Ratio { name, .. } => name,
        }
    }

    /// Cognitive test summaries: pairs-matching error total and test accuracies
    #[must_use]
    pub fn cognitive_test_features() -> Vec<Self> {
        vec![
            Self::Sum {
                name: "incorrectPairsMatchingTask".to_string(),
                sources: (1..=3)
                    .map(|i| format!("incorrectPairsMatchingTask{i}"))
                    .collect(),
                drop_sources: true,
            },
            Self::Ratio {
                name: "accuracyTowerTest".to_string(),
                numerator: "correctTowerTest".to_string(),
                denominator: "attemptsTowerTest".to_string(),
            },
            Self::Ratio {
                name: "accuracySymbolDigitTest".to_string(),
                numerator: "correctSymbolDigitTest".to_string(),
                denominator: "attemptsSymbolDigitTest".to_string(),
            },
        ]
    }
}

/// Names of the indicator columns the diagnosis classifier reads, and the
/// column it writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisColumns {
    pub any_ssd: String,
    pub any_mood_disorder: String,
    pub any_dementia: String,
    pub any_mental_disorder: String,
    pub output: String,
}

impl Default for DiagnosisColumns {
    fn default() -> Self {
        Self {
            any_ssd: "anySSD".to_string(),
            any_mood_disorder: "anyMoodDisorder".to_string(),
            any_dementia: "anyDementia".to_string(),
            any_mental_disorder: "anyMentalDisorder".to_string(),
            output: "dx".to_string(),
        }
    }
}

/// Configuration for a cohort build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Subject id column in the extract
    pub id_source: String,
    /// Subject id column in the output
    pub id_column: String,
    /// Indicator groups, derived in order
    pub indicator_groups: Vec<IndicatorGroup>,
    /// Indicators whose presence removes a subject
    pub excluded_indicators: Vec<String>,
    /// Hard equality filters applied after exclusion
    pub inclusion_predicates: Vec<InclusionPredicate>,
    pub diagnosis_columns: DiagnosisColumns,
    pub classification_mode: ClassificationMode,
    /// Diagnosis categories that make a subject a patient
    pub patient_categories: Vec<DiagnosisCategory>,
    pub derived_features: Vec<DerivedFeature>,
    /// Drop columns that are null for every subject right after reading
    pub drop_empty_columns: bool,
    /// Drop subjects with a null in `required_columns` before matching
    pub drop_incomplete: bool,
    /// Columns checked by `drop_incomplete`; empty means every column
    pub required_columns: Vec<String>,
    pub subject_type_column: String,
    /// Column linking each patient to its control and back
    pub matched_with_column: String,
    pub matching: MatchingConfig,
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id_source: "eid".to_string(),
            id_column: "id".to_string(),
            indicator_groups: vec![
                IndicatorGroup::education_levels("educationalQualifications"),
                IndicatorGroup::icd10_diagnoses("diagnoses"),
            ],
            excluded_indicators: vec!["anyDementia".to_string()],
            inclusion_predicates: Vec::new(),
            diagnosis_columns: DiagnosisColumns::default(),
            classification_mode: ClassificationMode::Strict,
            patient_categories: DiagnosisCategory::patient_categories().to_vec(),
            derived_features: Vec::new(),
            drop_empty_columns: true,
            drop_incomplete: false,
            required_columns: Vec::new(),
            subject_type_column: "subjectType".to_string(),
            matched_with_column: "matchedWith".to_string(),
            matching: MatchingConfig::default(),
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing a pipeline configuration
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Load a configuration from a JSON file; absent keys take default values
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Names of all indicator columns the configuration derives, in order
    #[must_use]
    pub fn indicator_names(&self) -> Vec<&str> {
        self.indicator_groups
            .iter()
            .flat_map(|g| g.rules.iter().map(|r| r.name.as_str()))
            .collect()
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.id_column.is_empty() || self.id_source.is_empty() {
            return Err(CohortError::Config("id column names must not be empty".to_string()));
        }

        let names = self.indicator_names();
        if let Some(name) = names.iter().duplicates().next() {
            return Err(CohortError::Config(format!(
                "indicator '{name}' is defined twice"
            )));
        }

        for group in &self.indicator_groups {
            if group.rules.is_empty() {
                return Err(CohortError::Config(format!(
                    "indicator group '{}' has no rules",
                    group.variable
                )));
            }
        }

        if let Some(missing) = self
            .excluded_indicators
            .iter()
            .find(|e| !names.contains(&e.as_str()))
        {
            return Err(CohortError::Config(format!(
                "excluded indicator '{missing}' is not derived by any indicator group"
            )));
        }

        if self.patient_categories.is_empty() {
            return Err(CohortError::Config(
                "at least one patient category is required".to_string(),
            ));
        }

        self.matching.validate()
    }
}

/// Builder for constructing a pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the extract and output id column names
    #[must_use]
    pub fn id_columns(mut self, source: impl Into<String>, output: impl Into<String>) -> Self {
        self.config.id_source = source.into();
        self.config.id_column = output.into();
        self
    }

    /// Replace the indicator groups
    #[must_use]
    pub fn indicator_groups(mut self, groups: Vec<IndicatorGroup>) -> Self {
        self.config.indicator_groups = groups;
        self
    }

    /// Replace the excluded indicators
    #[must_use]
    pub fn excluded_indicators(mut self, indicators: Vec<String>) -> Self {
        self.config.excluded_indicators = indicators;
        self
    }

    /// Add an equality inclusion filter
    #[must_use]
    pub fn include_where(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .inclusion_predicates
            .push(InclusionPredicate::Equals {
                column: column.into(),
                value: value.into(),
            });
        self
    }

    /// Set the classification mode
    #[must_use]
    pub const fn classification_mode(mut self, mode: ClassificationMode) -> Self {
        self.config.classification_mode = mode;
        self
    }

    /// Set the categories treated as patients
    #[must_use]
    pub fn patient_categories(mut self, categories: Vec<DiagnosisCategory>) -> Self {
        self.config.patient_categories = categories;
        self
    }

    /// Replace the derived features
    #[must_use]
    pub fn derived_features(mut self, features: Vec<DerivedFeature>) -> Self {
        self.config.derived_features = features;
        self
    }

    /// Set whether all-null columns are dropped after reading
    #[must_use]
    pub const fn drop_empty_columns(mut self, drop: bool) -> Self {
        self.config.drop_empty_columns = drop;
        self
    }

    /// Drop subjects with missing values in `columns` (all columns when empty)
    #[must_use]
    pub fn drop_incomplete(mut self, columns: Vec<String>) -> Self {
        self.config.drop_incomplete = true;
        self.config.required_columns = columns;
        self
    }

    /// Set the matching configuration
    #[must_use]
    pub fn matching(mut self, matching: MatchingConfig) -> Self {
        self.config.matching = matching;
        self
    }

    /// Set whether progress bars are drawn
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
