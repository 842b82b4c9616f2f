use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use log::info;

use cohort_builder::{
    ClassificationMode, CohortPipeline, ControlSelection, DerivedFeature, PipelineConfig,
    VariableCatalog,
};

/// Build a matched case-control cohort from a CSV extract
#[derive(Parser)]
#[command(name = "cohort-build", version)]
struct Cli {
    /// Extract CSV with one row per subject
    #[arg(value_name = "INPUT_CSV")]
    input: PathBuf,

    /// Directory the dated dataset is written to
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Variable catalog JSON files; later files override earlier entries
    #[arg(long = "catalog", value_name = "PATH", required = true, num_args = 1..)]
    catalogs: Vec<PathBuf>,

    /// Pipeline configuration JSON (defaults are used when omitted)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Add the cognitive test sum and accuracy features
    #[arg(long = "cognitive-features")]
    cognitive_features: bool,

    /// Use each control at most once
    #[arg(long = "without-replacement")]
    without_replacement: bool,

    /// Classify subjects outside the SSD/mood table instead of aborting
    #[arg(long = "extended-classification")]
    extended_classification: bool,

    /// Disable progress bars
    #[arg(long = "no-progress")]
    no_progress: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if !cli.input.is_file() {
        bail!("Input file does not exist: {}", cli.input.display());
    }
    if !cli.output_dir.is_dir() {
        bail!("Output directory does not exist: {}", cli.output_dir.display());
    }

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if cli.cognitive_features {
        config
            .derived_features
            .extend(DerivedFeature::cognitive_test_features());
    }
    if cli.without_replacement {
        config.matching.selection = ControlSelection::WithoutReplacement;
    }
    if cli.extended_classification {
        config.classification_mode = ClassificationMode::Extended;
    }
    if cli.no_progress {
        config.show_progress = false;
    }

    let catalog = VariableCatalog::from_json_files(&cli.catalogs)
        .context("Failed to load variable catalog")?;
    info!(
        "Catalog has {} variables ({} included)",
        catalog.len(),
        catalog.included().count()
    );

    let start = Instant::now();
    let pipeline = CohortPipeline::new(config, catalog)?;
    let path = pipeline
        .build(&cli.input, &cli.output_dir)
        .with_context(|| format!("Failed to build cohort from {}", cli.input.display()))?;

    info!("Dataset written to {} in {:.2?}", path.display(), start.elapsed());
    Ok(())
}
