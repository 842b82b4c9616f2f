use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cohort_builder::algorithm::matching::{Matcher, MatchingResult};
use cohort_builder::utils::arrow::subject_ids;
use cohort_builder::{ControlSelection, MatchingConfig};

/// Deterministic xorshift generator for reproducible pools
struct Xorshift(u64);

impl Xorshift {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn age(&mut self) -> f64 {
        40.0 + (self.next_u64() % 30) as f64
    }

    fn sex(&mut self) -> &'static str {
        if self.next_u64() % 2 == 0 { "Female" } else { "Male" }
    }
}

fn pool(prefix: &str, n: usize, rng: &mut Xorshift) -> RecordBatch {
    let ids: Vec<String> = (0..n).map(|i| format!("{prefix}{i:04}")).collect();
    let ages: Vec<f64> = (0..n).map(|_| rng.age()).collect();
    let sexes: Vec<&str> = (0..n).map(|_| rng.sex()).collect();

    let schema = Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("age", DataType::Float64, true),
        Field::new("sex", DataType::Utf8, true),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Float64Array::from(ages)),
            Arc::new(StringArray::from(sexes)),
        ],
    )
    .unwrap()
}

fn covariates(batch: &RecordBatch, row: usize) -> (f64, f64) {
    let age = batch
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap()
        .value(row);
    let sex = batch
        .column(2)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .value(row);
    (age, if sex == "Female" { 1.0 } else { 0.0 })
}

fn run(config: MatchingConfig, patients: &RecordBatch, controls: &RecordBatch) -> MatchingResult {
    Matcher::new(config)
        .perform_matching(patients, controls, "id")
        .unwrap()
}

#[test]
fn test_each_patient_gets_nearest_control() {
    let mut rng = Xorshift(0x9E37_79B9_7F4A_7C15);
    let patients = pool("P", 150, &mut rng);
    let controls = pool("C", 400, &mut rng);

    let result = run(MatchingConfig::default(), &patients, &controls);
    assert_eq!(result.pairs.len(), patients.num_rows());

    for pair in &result.pairs {
        let (age, sex) = covariates(&patients, pair.patient_row);
        let (best_row, best) = (0..controls.num_rows())
            .map(|row| {
                let (c_age, c_sex) = covariates(&controls, row);
                (row, (c_age - age).hypot(c_sex - sex))
            })
            .fold((usize::MAX, f64::INFINITY), |acc, (row, d)| {
                if d < acc.1 { (row, d) } else { acc }
            });
        assert_eq!(pair.distance, best);
        assert_eq!(pair.control_row, best_row, "ties resolve to the first control");
    }
}

#[test]
fn test_matched_controls_align_with_pairs() {
    let mut rng = Xorshift(42);
    let patients = pool("P", 60, &mut rng);
    let controls = pool("C", 100, &mut rng);

    let result = run(MatchingConfig::default(), &patients, &controls);
    let patient_ids = subject_ids(&result.patients, "id").unwrap();
    let control_ids = subject_ids(&result.matched_controls, "id").unwrap();

    assert_eq!(control_ids.len(), patient_ids.len());
    for (row, pair) in result.pairs.iter().enumerate() {
        assert_eq!(pair.patient_id, patient_ids[row]);
        assert_eq!(pair.control_id, control_ids[row]);
    }
    assert!(result.distinct_controls <= result.pairs.len());
}

#[test]
fn test_parallel_agrees_with_sequential() {
    let mut rng = Xorshift(7);
    let patients = pool("P", 300, &mut rng);
    let controls = pool("C", 250, &mut rng);

    let sequential = run(
        MatchingConfig::builder().use_parallel(false).build(),
        &patients,
        &controls,
    );
    let parallel = run(
        MatchingConfig::builder()
            .use_parallel(true)
            .parallel_threshold(1)
            .build(),
        &patients,
        &controls,
    );

    let rows = |r: &MatchingResult| r.pairs.iter().map(|p| p.control_row).collect::<Vec<_>>();
    assert_eq!(rows(&sequential), rows(&parallel));
}

#[test]
fn test_without_replacement_never_reuses_controls() {
    let mut rng = Xorshift(1234);
    let patients = pool("P", 80, &mut rng);
    let controls = pool("C", 120, &mut rng);

    let result = run(
        MatchingConfig::builder()
            .selection(ControlSelection::WithoutReplacement)
            .build(),
        &patients,
        &controls,
    );
    assert_eq!(result.distinct_controls, patients.num_rows());

    let with_replacement = run(MatchingConfig::default(), &patients, &controls);
    let total = |r: &MatchingResult| r.pairs.iter().map(|p| p.distance).sum::<f64>();
    assert!(total(&result) >= total(&with_replacement));
}

#[test]
fn test_no_patients_gives_empty_cohort() {
    let mut rng = Xorshift(99);
    let patients = pool("P", 0, &mut rng);
    let controls = pool("C", 10, &mut rng);

    let result = run(MatchingConfig::default(), &patients, &controls);
    assert!(result.pairs.is_empty());
    assert_eq!(result.matched_controls.num_rows(), 0);
    assert_eq!(result.mean_distance(), None);
}
