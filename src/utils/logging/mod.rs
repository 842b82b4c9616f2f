//! Logging utilities for stage reporting and progress tracking

pub mod log;
pub mod progress;

pub use log::{log_data_quality, log_row_change, log_stage_start};
pub use progress::{create_main_progress_bar, finish_progress_bar};
