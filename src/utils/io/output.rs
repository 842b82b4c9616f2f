//! Dated cohort datasets on disk
//!
//! Each build writes `dataset_<YYYY-MM-DD>.csv` into the output directory.
//! Files are written under a temporary name and renamed into place, so a
//! failed run never leaves a partial dataset behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::{debug, info};

use crate::error::{CohortError, Result};
use crate::reader::read_csv_table;

const PREFIX: &str = "dataset_";
const SUFFIX: &str = ".csv";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates that a directory exists and is a directory
///
/// # Errors
/// Returns an error if the directory does not exist or is not a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(CohortError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// File name of the dataset built on `date`
#[must_use]
pub fn dataset_file_name(date: NaiveDate) -> String {
    format!("{PREFIX}{}{SUFFIX}", date.format(DATE_FORMAT))
}

/// Build date encoded in a dataset file name
#[must_use]
pub fn parse_dataset_date(file_name: &str) -> Option<NaiveDate> {
    let date = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

/// Write `batch` as the dataset for `date`, replacing any file of that name
pub fn write_dataset(batch: &RecordBatch, output_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    validate_directory(output_dir)?;

    let file_name = dataset_file_name(date);
    let target = output_dir.join(&file_name);
    let staging = output_dir.join(format!(".{file_name}.tmp"));

    if let Err(e) = write_csv(batch, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, &target)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        batch.num_rows(),
        batch.num_columns(),
        target.display()
    );
    Ok(target)
}

/// Most recent dataset in `output_dir`, by the date in its file name.
///
/// Files not named `dataset_<YYYY-MM-DD>.csv` are ignored.
pub fn latest_dataset(output_dir: &Path) -> Result<Option<PathBuf>> {
    validate_directory(output_dir)?;

    let mut latest: Option<(NaiveDate, PathBuf)> = None;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        let Some(date) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_dataset_date)
        else {
            continue;
        };
        if latest.as_ref().is_none_or(|(best, _)| date > *best) {
            latest = Some((date, path));
        }
    }

    if let Some((date, path)) = &latest {
        debug!("Latest dataset is from {date}: {}", path.display());
    }
    Ok(latest.map(|(_, path)| path))
}

/// Load the most recent dataset in `output_dir`.
///
/// All columns are read as text; subject ids come back exactly as written.
///
/// # Errors
/// Returns [`CohortError::NoDatasetFound`] when the directory holds no dataset.
pub fn load_latest(output_dir: &Path) -> Result<RecordBatch> {
    let path = latest_dataset(output_dir)?
        .ok_or_else(|| CohortError::NoDatasetFound(output_dir.to_path_buf()))?;
    info!("Loading dataset {}", path.display());
    read_csv_table(&path)
}
