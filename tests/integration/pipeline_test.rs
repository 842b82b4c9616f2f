use arrow::array::{Array, Float64Array};
use cohort_builder::utils::arrow::get_column_by_name;
use cohort_builder::{
    ClassificationMode, CohortError, CohortPipeline, ControlSelection, DerivedFeature,
    MatchingConfig, PipelineConfig,
};
use tempfile::TempDir;

use crate::utils::{
    SUBJECT_A, SUBJECT_B, SUBJECT_C, SUBJECT_D, SUBJECT_E, SUBJECT_G, Subject, catalog,
    column_names, column_strings, column_values, scenario_subjects, test_config, write_extract,
};

fn pipeline(config: PipelineConfig) -> CohortPipeline {
    CohortPipeline::new(config, catalog()).unwrap()
}

fn strs(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[test]
fn test_reference_scenario() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let cohort = pipeline(test_config()).run(&input).unwrap();
    let table = &cohort.table;

    assert_eq!(cohort.patients, 2);
    assert_eq!(cohort.controls, 2);
    assert_eq!(cohort.distinct_controls, 1);
    assert_eq!(table.num_rows(), 4);

    assert_eq!(
        column_values(table, "id"),
        strs(&["01001", "01002", "01003", "01003"])
    );
    assert_eq!(
        column_values(table, "subjectType"),
        strs(&["patient", "patient", "control", "control"])
    );
    assert_eq!(
        column_values(table, "matchedWith"),
        strs(&["01003", "01003", "01001", "01002"])
    );
    assert_eq!(
        column_strings(table, "dx"),
        vec![
            Some("Only SSD".to_string()),
            Some("Only Mood Disorder".to_string()),
            None,
            None,
        ]
    );
}

#[test]
fn test_output_columns() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let cohort = pipeline(test_config()).run(&input).unwrap();
    let names = column_names(&cohort.table);

    // Slot columns of indicator sources are gone
    assert!(!names.iter().any(|n| n.starts_with("diagnoses")));
    assert!(!names.iter().any(|n| n.starts_with("educationalQualifications")));
    // Summed sources are replaced by their total
    assert!(!names.iter().any(|n| n == "incorrectPairsMatchingTask1"));
    // Excluded catalog entries are never read
    assert!(!names.iter().any(|n| n.starts_with("medication")));

    for expected in [
        "id",
        "sex",
        "age",
        "handedness",
        "EduUniversityDegree",
        "EduNoneOfTheAbove",
        "anySSD",
        "anyMoodDisorder",
        "anyMentalDisorder",
        "incorrectPairsMatchingTask",
        "accuracyTowerTest",
        "dx",
        "subjectType",
        "matchedWith",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing column {expected}");
    }
    assert_eq!(names[0], "id");
    assert_eq!(&names[names.len() - 3..], &["dx", "subjectType", "matchedWith"]);
}

#[test]
fn test_recoded_and_derived_values() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let table = pipeline(test_config()).run(&input).unwrap().table;

    assert_eq!(
        column_values(&table, "sex"),
        strs(&["Female", "Male", "Female", "Female"])
    );
    assert_eq!(
        column_values(&table, "handedness"),
        strs(&["Right-handed", "Right-handed", "Left-handed", "Left-handed"])
    );
    assert_eq!(
        column_values(&table, "EduUniversityDegree"),
        strs(&["true", "false", "true", "true"])
    );
    assert_eq!(
        column_values(&table, "EduALevelsOrEq"),
        strs(&["false", "true", "false", "false"])
    );
    assert_eq!(
        column_values(&table, "EduNoneOfTheAbove"),
        strs(&["false", "true", "false", "false"])
    );

    let pairs = get_column_by_name(&table, "incorrectPairsMatchingTask").unwrap();
    let pairs = pairs.as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(pairs.value(0), 6.0);
    assert!(pairs.is_null(1));
    assert_eq!(pairs.value(2), 6.0);

    let tower = get_column_by_name(&table, "accuracyTowerTest").unwrap();
    let tower = tower.as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(tower.value(0), 0.5);
    assert_eq!(tower.value(1), 0.5);
    assert_eq!(tower.value(2), 1.0);
}

#[test]
fn test_dementia_subjects_never_appear() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let pipeline = pipeline(test_config());
    let population = pipeline.classify_population(&input).unwrap();
    assert_eq!(population.num_rows(), 3);
    assert!(!column_values(&population, "id").contains(&SUBJECT_D.eid.to_string()));

    let split = pipeline.partition(&population).unwrap();
    assert_eq!(split.patients.num_rows(), 2);
    assert_eq!(split.controls.num_rows(), 1);
    assert_eq!(split.unassigned, 0);
}

#[test]
fn test_nearest_control_is_chosen() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &[SUBJECT_A, SUBJECT_B, SUBJECT_C, SUBJECT_G]);

    let cohort = pipeline(test_config()).run(&input).unwrap();
    assert_eq!(cohort.distinct_controls, 2);
    assert_eq!(
        column_values(&cohort.table, "matchedWith"),
        strs(&["01003", "01007", "01001", "01002"])
    );
    assert_eq!(cohort.pairs[0].distance, 3.0);
    assert_eq!(cohort.pairs[1].distance, 1.0);
}

#[test]
fn test_strict_mode_rejects_other_mental_disorder() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &[SUBJECT_A, SUBJECT_C, SUBJECT_E]);

    let err = pipeline(test_config()).run(&input).unwrap_err();
    assert!(
        matches!(err, CohortError::Classification { ref subject, any_mental_disorder: true, .. } if subject == SUBJECT_E.eid)
    );
}

#[test]
fn test_extended_mode_leaves_other_disorders_unassigned() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &[SUBJECT_A, SUBJECT_C, SUBJECT_E]);

    let config = PipelineConfig::builder()
        .classification_mode(ClassificationMode::Extended)
        .show_progress(false)
        .build()
        .unwrap();
    let pipeline = pipeline(config);

    let population = pipeline.classify_population(&input).unwrap();
    assert_eq!(
        column_strings(&population, "dx")[2].as_deref(),
        Some("Other Mental Disorder")
    );

    let split = pipeline.partition(&population).unwrap();
    assert_eq!(split.unassigned, 1);

    let cohort = pipeline.run(&input).unwrap();
    assert_eq!(column_values(&cohort.table, "id"), strs(&["01001", "01003"]));
}

#[test]
fn test_without_replacement_exhausts_pool() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let config = PipelineConfig::builder()
        .matching(
            MatchingConfig::builder()
                .selection(ControlSelection::WithoutReplacement)
                .build(),
        )
        .show_progress(false)
        .build()
        .unwrap();

    let err = pipeline(config).run(&input).unwrap_err();
    assert!(matches!(
        err,
        CohortError::InsufficientControls {
            patients: 2,
            controls: 1
        }
    ));
}

#[test]
fn test_without_replacement_uses_distinct_controls() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &[SUBJECT_A, SUBJECT_B, SUBJECT_C, SUBJECT_G]);

    let config = PipelineConfig::builder()
        .matching(
            MatchingConfig::builder()
                .selection(ControlSelection::WithoutReplacement)
                .build(),
        )
        .show_progress(false)
        .build()
        .unwrap();

    let cohort = pipeline(config).run(&input).unwrap();
    assert_eq!(cohort.distinct_controls, 2);
    assert_eq!(
        column_values(&cohort.table, "matchedWith"),
        strs(&["01003", "01007", "01001", "01002"])
    );
}

#[test]
fn test_missing_age_aborts_matching() {
    let dir = TempDir::new().unwrap();
    let no_age = Subject {
        age: "",
        ..SUBJECT_C
    };
    let input = write_extract(dir.path(), &[SUBJECT_A, no_age, SUBJECT_G]);

    let err = pipeline(test_config()).run(&input).unwrap_err();
    assert!(matches!(
        err,
        CohortError::MissingCovariate { ref subject, role: "control", ref covariate }
            if subject == "01003" && covariate == "age"
    ));
}

#[test]
fn test_incomplete_rows_can_be_dropped() {
    let dir = TempDir::new().unwrap();
    let no_age = Subject {
        age: "",
        ..SUBJECT_C
    };
    let input = write_extract(dir.path(), &[SUBJECT_A, no_age, SUBJECT_G]);

    let config = PipelineConfig::builder()
        .drop_incomplete(vec!["age".to_string(), "sex".to_string()])
        .show_progress(false)
        .build()
        .unwrap();

    let cohort = pipeline(config).run(&input).unwrap();
    assert_eq!(
        column_values(&cohort.table, "id"),
        strs(&["01001", "01007"])
    );
}

#[test]
fn test_inclusion_predicate_restricts_population() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &[SUBJECT_A, SUBJECT_B, SUBJECT_C, SUBJECT_G]);

    let config = PipelineConfig::builder()
        .include_where("handedness", "Right-handed")
        .show_progress(false)
        .build()
        .unwrap();

    // Subject C is left-handed, so G is the only control left
    let cohort = pipeline(config).run(&input).unwrap();
    assert_eq!(
        column_values(&cohort.table, "id"),
        strs(&["01001", "01002", "01007", "01007"])
    );
}

#[test]
fn test_features_without_sources_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = write_extract(dir.path(), &scenario_subjects());

    let config = PipelineConfig::builder()
        .derived_features(vec![DerivedFeature::Ratio {
            name: "accuracyTrailMaking".to_string(),
            numerator: "trailMakingCorrect".to_string(),
            denominator: "trailMakingAttempts".to_string(),
        }])
        .show_progress(false)
        .build()
        .unwrap();

    let cohort = pipeline(config).run(&input).unwrap();
    assert!(!column_names(&cohort.table).contains(&"accuracyTrailMaking".to_string()));
}

#[test]
fn test_missing_extract_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("extract.csv");
    std::fs::write(&input, "eid,31-0.0\n01001,0\n").unwrap();

    let err = pipeline(test_config()).run(&input).unwrap_err();
    assert!(matches!(err, CohortError::ColumnNotFound { ref column } if column == "21003-2.0"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PipelineConfig {
        excluded_indicators: vec!["anyNeurologicalDisorder".to_string()],
        ..PipelineConfig::default()
    };
    let err = CohortPipeline::new(config, catalog()).unwrap_err();
    assert!(matches!(err, CohortError::Config(_)));
}
