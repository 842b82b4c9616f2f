//! Shared fixtures: small extracts written to temporary directories

use std::fs;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef};
use arrow::record_batch::RecordBatch;
use cohort_builder::utils::arrow::{cell_as_string, get_column_by_name};
use cohort_builder::{DerivedFeature, PipelineConfig, VariableCatalog};

/// Catalog covering every kind of variable the pipeline handles
pub const CATALOG_JSON: &str = r#"{
    "sex": {
        "DataField": 31, "InstanceNum": 0,
        "ArrayRange": {"start": 0, "stop": 1, "step": 1},
        "Included": true,
        "Coding": {"0": "Female", "1": "Male"}
    },
    "age": {
        "DataField": 21003, "InstanceNum": 2,
        "ArrayRange": {"start": 0, "stop": 1, "step": 1},
        "Included": true,
        "Coding": null
    },
    "diagnoses": {
        "DataField": 41270, "InstanceNum": 0,
        "ArrayRange": {"start": 0, "stop": 3, "step": 1},
        "Included": true,
        "Coding": null
    },
    "educationalQualifications": {
        "DataField": 6138, "InstanceNum": 2,
        "ArrayRange": {"start": 0, "stop": 2, "step": 1},
        "Included": true,
        "Coding": {
            "1": "College or University degree",
            "2": "A levels/AS levels or equivalent",
            "-7": "None of the above",
            "-3": "Prefer not to answer"
        }
    },
    "handedness": {
        "DataField": 1707, "InstanceNum": 0,
        "ArrayRange": {"start": 0, "stop": 1, "step": 1},
        "Included": true,
        "Coding": {"1": "Right-handed", "2": "Left-handed"}
    },
    "incorrectPairsMatchingTask": {
        "DataField": 399, "InstanceNum": 2,
        "ArrayRange": {"start": 1, "stop": 4, "step": 1},
        "Included": true,
        "Coding": null
    },
    "correctTowerTest": {
        "DataField": 21004, "InstanceNum": 2,
        "ArrayRange": {"start": 0, "stop": 1, "step": 1},
        "Included": true
    },
    "attemptsTowerTest": {
        "DataField": 6373, "InstanceNum": 2,
        "ArrayRange": {"start": 0, "stop": 1, "step": 1},
        "Included": true
    },
    "medication": {
        "DataField": 20003, "InstanceNum": 2,
        "ArrayRange": {"start": 0, "stop": 2, "step": 1},
        "Included": false
    }
}"#;

const HEADER: &str = "eid,31-0.0,21003-2.0,41270-0.0,41270-0.1,41270-0.2,6138-2.0,6138-2.1,\
                      1707-0.0,399-2.1,399-2.2,399-2.3,21004-2.0,6373-2.0,20003-2.0,20003-2.1";

/// One extract row
#[derive(Debug, Clone)]
pub struct Subject {
    pub eid: &'static str,
    pub sex: &'static str,
    pub age: &'static str,
    pub diagnoses: [&'static str; 3],
    pub education: [&'static str; 2],
    pub handedness: &'static str,
    pub pairs: [&'static str; 3],
    pub tower: [&'static str; 2],
}

impl Subject {
    fn csv_line(&self) -> String {
        let mut cells = vec![self.eid, self.sex, self.age];
        cells.extend(self.diagnoses);
        cells.extend(self.education);
        cells.push(self.handedness);
        cells.extend(self.pairs);
        cells.extend(self.tower);
        cells.extend(["1140861998", ""]);
        cells.join(",")
    }
}

/// Patient with schizophrenia
pub const SUBJECT_A: Subject = Subject {
    eid: "01001",
    sex: "0",
    age: "55",
    diagnoses: ["F20", "", ""],
    education: ["1", ""],
    handedness: "1",
    pairs: ["1", "2", "3"],
    tower: ["10", "20"],
};

/// Patient with bipolar disorder and hypertension
pub const SUBJECT_B: Subject = Subject {
    eid: "01002",
    sex: "1",
    age: "61",
    diagnoses: ["F31", "I10", ""],
    education: ["2", "-7"],
    handedness: "1",
    pairs: ["0", "1", ""],
    tower: ["8", "16"],
};

/// Healthy subject
pub const SUBJECT_C: Subject = Subject {
    eid: "01003",
    sex: "0",
    age: "58",
    diagnoses: ["", "", ""],
    education: ["1", ""],
    handedness: "2",
    pairs: ["2", "2", "2"],
    tower: ["12", "12"],
};

/// Subject with dementia only
pub const SUBJECT_D: Subject = Subject {
    eid: "01004",
    sex: "1",
    age: "70",
    diagnoses: ["F00", "", ""],
    education: ["-3", ""],
    handedness: "1",
    pairs: ["5", "5", "5"],
    tower: ["3", "0"],
};

/// Subject with an anxiety disorder only
pub const SUBJECT_E: Subject = Subject {
    eid: "01005",
    sex: "0",
    age: "45",
    diagnoses: ["F41", "", ""],
    education: ["1", ""],
    handedness: "1",
    pairs: ["1", "1", "1"],
    tower: ["9", "10"],
};

/// Healthy male close in age to subject B
pub const SUBJECT_G: Subject = Subject {
    eid: "01007",
    sex: "1",
    age: "62",
    diagnoses: ["", "", ""],
    education: ["2", ""],
    handedness: "1",
    pairs: ["0", "0", "1"],
    tower: ["11", "12"],
};

/// The four subjects of the reference scenario
#[must_use]
pub fn scenario_subjects() -> Vec<Subject> {
    vec![SUBJECT_A, SUBJECT_B, SUBJECT_C, SUBJECT_D]
}

/// Write an extract CSV into `dir`
pub fn write_extract(dir: &Path, subjects: &[Subject]) -> PathBuf {
    let mut content = String::from(HEADER);
    content.push('\n');
    for subject in subjects {
        content.push_str(&subject.csv_line());
        content.push('\n');
    }
    let path = dir.join("extract.csv");
    fs::write(&path, content).unwrap();
    path
}

/// Parsed fixture catalog
#[must_use]
pub fn catalog() -> VariableCatalog {
    VariableCatalog::from_json_str(CATALOG_JSON).unwrap()
}

/// Default configuration with cognitive features and without progress bars
#[must_use]
pub fn test_config() -> PipelineConfig {
    PipelineConfig::builder()
        .derived_features(DerivedFeature::cognitive_test_features())
        .show_progress(false)
        .build()
        .unwrap()
}

/// Values of a column rendered as strings
#[must_use]
pub fn column_strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array: ArrayRef = get_column_by_name(batch, column).unwrap();
    (0..array.len())
        .map(|row| cell_as_string(&array, row).unwrap())
        .collect()
}

/// Non-null values of a column rendered as strings
#[must_use]
pub fn column_values(batch: &RecordBatch, column: &str) -> Vec<String> {
    column_strings(batch, column).into_iter().flatten().collect()
}

/// Column names in order
#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}
