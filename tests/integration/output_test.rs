use std::fs;

use chrono::NaiveDate;
use cohort_builder::utils::io::{latest_dataset, load_latest};
use cohort_builder::{CohortError, CohortPipeline};
use tempfile::TempDir;

use crate::utils::{catalog, column_names, column_values, scenario_subjects, test_config, write_extract};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_built_dataset_reloads() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = write_extract(input_dir.path(), &scenario_subjects());

    let pipeline = CohortPipeline::new(test_config(), catalog()).unwrap();
    let cohort = pipeline.run(&input).unwrap();
    let path = pipeline
        .build_dated(&input, output_dir.path(), date(2024, 5, 1))
        .unwrap();

    assert_eq!(path.file_name().unwrap(), "dataset_2024-05-01.csv");

    let reloaded = load_latest(output_dir.path()).unwrap();
    assert_eq!(reloaded.num_rows(), cohort.table.num_rows());
    assert_eq!(column_names(&reloaded), column_names(&cohort.table));
    // Ids come back as text with their leading zeros
    assert_eq!(
        column_values(&reloaded, "id"),
        column_values(&cohort.table, "id")
    );
    assert_eq!(
        column_values(&reloaded, "subjectType"),
        vec!["patient", "patient", "control", "control"]
    );
}

#[test]
fn test_latest_dataset_wins() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = write_extract(input_dir.path(), &scenario_subjects());
    let pipeline = CohortPipeline::new(test_config(), catalog()).unwrap();

    pipeline
        .build_dated(&input, output_dir.path(), date(2024, 5, 1))
        .unwrap();
    let newest = pipeline
        .build_dated(&input, output_dir.path(), date(2025, 1, 15))
        .unwrap();
    pipeline
        .build_dated(&input, output_dir.path(), date(2023, 12, 31))
        .unwrap();
    fs::write(output_dir.path().join("dataset_latest.csv"), "id\n1\n").unwrap();
    fs::write(output_dir.path().join("notes.txt"), "not a dataset").unwrap();

    assert_eq!(latest_dataset(output_dir.path()).unwrap(), Some(newest));
}

#[test]
fn test_empty_directory_has_no_dataset() {
    let output_dir = TempDir::new().unwrap();

    assert_eq!(latest_dataset(output_dir.path()).unwrap(), None);
    let err = load_latest(output_dir.path()).unwrap_err();
    assert!(matches!(err, CohortError::NoDatasetFound(_)));
}

#[test]
fn test_failed_build_writes_nothing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let mut subjects = scenario_subjects();
    subjects.push(crate::utils::SUBJECT_E);
    let input = write_extract(input_dir.path(), &subjects);

    let pipeline = CohortPipeline::new(test_config(), catalog()).unwrap();
    let err = pipeline
        .build_dated(&input, output_dir.path(), date(2024, 5, 1))
        .unwrap_err();
    assert!(matches!(err, CohortError::Classification { .. }));
    assert_eq!(fs::read_dir(output_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_output_directory() {
    let input_dir = TempDir::new().unwrap();
    let input = write_extract(input_dir.path(), &scenario_subjects());
    let missing = input_dir.path().join("does-not-exist");

    let pipeline = CohortPipeline::new(test_config(), catalog()).unwrap();
    let err = pipeline
        .build_dated(&input, &missing, date(2024, 5, 1))
        .unwrap_err();
    assert!(matches!(err, CohortError::Io(_)));
}
