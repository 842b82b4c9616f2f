//! End-to-end cohort construction
//!
//! [`CohortPipeline`] runs the stages in a fixed order over one in-memory
//! table: resolve the catalog, read the extract, derive indicators, recode
//! and coerce, compute derived features, filter, classify, partition, match,
//! and assemble the matched cohort. Nothing is written until the cohort is
//! complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use chrono::{Local, NaiveDate};
use log::info;

use crate::algorithm::health::{apply_indicator_group, classify_batch};
use crate::algorithm::matching::{MatchedPair, Matcher, MatchingResult};
use crate::algorithm::population::{
    BatchFilter, CohortPartition, CompletenessFilter, ExclusionFilter, partition,
};
use crate::catalog::{ColumnResolver, VariableCatalog};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::reader::read_extract;
use crate::transform::{apply_derived_features, coerce_numeric, recode_variables};
use crate::utils::arrow::append_columns;
use crate::utils::io::write_dataset;
use crate::utils::logging::{log_row_change, log_stage_start};

const TOTAL_STEPS: usize = 8;

fn apply_filter(batch: &RecordBatch, stage: &str, filter: &dyn BatchFilter) -> Result<RecordBatch> {
    let start = Instant::now();
    let filtered = filter.filter(batch)?;
    log_row_change(
        stage,
        batch.num_rows(),
        filtered.num_rows(),
        Some(start.elapsed()),
    );
    Ok(filtered)
}

/// Label of patient rows in the subject type column
pub const PATIENT_LABEL: &str = "patient";
/// Label of control rows in the subject type column
pub const CONTROL_LABEL: &str = "control";

/// A matched cohort: every patient followed by its control
#[derive(Debug, Clone)]
pub struct CohortTable {
    /// Patient rows first, then one control row per patient in the same order
    pub table: RecordBatch,
    pub patients: usize,
    pub controls: usize,
    /// Number of different subjects among the controls
    pub distinct_controls: usize,
    pub pairs: Vec<MatchedPair>,
}

/// Orchestrates cohort construction from an extract
#[derive(Debug, Clone)]
pub struct CohortPipeline {
    config: PipelineConfig,
    catalog: VariableCatalog,
}

impl CohortPipeline {
    /// Create a pipeline, validating the configuration
    pub fn new(config: PipelineConfig, catalog: VariableCatalog) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, catalog })
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &VariableCatalog {
        &self.catalog
    }

    /// Read and prepare the population up to and including classification.
    ///
    /// The returned table holds every subject that survived exclusion and
    /// inclusion, with indicator columns and the diagnosis category column.
    pub fn classify_population(&self, input: &Path) -> Result<RecordBatch> {
        let config = &self.config;

        log_stage_start(1, TOTAL_STEPS, "Resolving catalog columns");
        let mut resolved =
            ColumnResolver::new(&config.id_source, &config.id_column).resolve(&self.catalog)?;
        info!(
            "{} variables expand to {} extract columns",
            resolved.groups().len(),
            resolved.source.len()
        );

        log_stage_start(2, TOTAL_STEPS, "Reading extract");
        let mut batch = read_extract(input, &mut resolved, config.drop_empty_columns)?;

        log_stage_start(3, TOTAL_STEPS, "Deriving indicators");
        for group in &config.indicator_groups {
            batch = apply_indicator_group(
                &batch,
                group,
                &mut resolved,
                &self.catalog,
                config.show_progress,
            )?;
        }

        log_stage_start(4, TOTAL_STEPS, "Recoding values and coercing numeric columns");
        batch = recode_variables(&batch, &self.catalog, &resolved)?;
        batch = coerce_numeric(&batch, &[config.id_column.as_str()])?;

        log_stage_start(5, TOTAL_STEPS, "Computing derived features");
        batch = apply_derived_features(&batch, &config.derived_features)?;

        log_stage_start(6, TOTAL_STEPS, "Applying exclusion and inclusion criteria");
        let exclusion = ExclusionFilter::new(config.excluded_indicators.clone());
        batch = apply_filter(&batch, "Exclusion", &exclusion)?;
        for predicate in &config.inclusion_predicates {
            batch = apply_filter(&batch, "Inclusion", predicate)?;
        }
        if config.drop_incomplete {
            let filter = CompletenessFilter::new(config.required_columns.clone());
            batch = apply_filter(&batch, "Completeness", &filter)?;
        }

        log_stage_start(7, TOTAL_STEPS, "Classifying diagnoses");
        let categories = classify_batch(
            &batch,
            &config.id_column,
            &config.diagnosis_columns,
            config.classification_mode,
        )?;
        append_columns(
            &batch,
            vec![(config.diagnosis_columns.output.clone(), categories)],
        )
    }

    /// Split a classified population into patients and controls
    pub fn partition(&self, population: &RecordBatch) -> Result<CohortPartition> {
        partition(
            population,
            &self.config.id_column,
            &self.config.diagnosis_columns.output,
            &self.config.diagnosis_columns.any_mental_disorder,
            &self.config.patient_categories,
        )
    }

    /// Build the matched cohort from an extract without writing it
    pub fn run(&self, input: &Path) -> Result<CohortTable> {
        let start = Instant::now();
        let population = self.classify_population(input)?;

        log_stage_start(8, TOTAL_STEPS, "Matching patients to controls");
        let split = self.partition(&population)?;
        let matched = Matcher::new(self.config.matching.clone())
            .with_progress(self.config.show_progress)
            .perform_matching(&split.patients, &split.controls, &self.config.id_column)?;

        let cohort = self.assemble(matched)?;
        info!(
            "Cohort of {} patients and {} controls ({} distinct) built in {:.2?}",
            cohort.patients,
            cohort.controls,
            cohort.distinct_controls,
            start.elapsed()
        );
        Ok(cohort)
    }

    /// Stack patients and their controls into one table
    fn assemble(&self, matched: MatchingResult) -> Result<CohortTable> {
        let label = |value: &str, n: usize| -> ArrayRef {
            Arc::new(StringArray::from(vec![value; n]))
        };
        let ids = |values: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(values)) };

        let n = matched.pairs.len();
        let patients = append_columns(
            &matched.patients,
            vec![
                (self.config.subject_type_column.clone(), label(PATIENT_LABEL, n)),
                (
                    self.config.matched_with_column.clone(),
                    ids(matched.pairs.iter().map(|p| p.control_id.as_str()).collect()),
                ),
            ],
        )?;
        let controls = append_columns(
            &matched.matched_controls,
            vec![
                (self.config.subject_type_column.clone(), label(CONTROL_LABEL, n)),
                (
                    self.config.matched_with_column.clone(),
                    ids(matched.pairs.iter().map(|p| p.patient_id.as_str()).collect()),
                ),
            ],
        )?;

        let table = concat_batches(&patients.schema(), [&patients, &controls])?;
        Ok(CohortTable {
            table,
            patients: patients.num_rows(),
            controls: controls.num_rows(),
            distinct_controls: matched.distinct_controls,
            pairs: matched.pairs,
        })
    }

    /// Build the cohort and write it as `dataset_<date>.csv` into `output_dir`
    pub fn build_dated(&self, input: &Path, output_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let cohort = self.run(input)?;
        write_dataset(&cohort.table, output_dir, date)
    }

    /// Build the cohort and write it under today's date
    pub fn build(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.build_dated(input, output_dir, Local::now().date_naive())
    }
}
