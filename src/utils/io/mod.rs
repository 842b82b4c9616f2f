//! IO utilities for file operations
//!
//! This module provides utilities for writing and locating dated cohort
//! datasets.

pub mod output;

pub use output::{
    dataset_file_name, latest_dataset, load_latest, parse_dataset_date, validate_directory,
    write_dataset,
};
