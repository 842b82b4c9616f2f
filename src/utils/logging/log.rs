//! Logging utilities
//!
//! This module provides standardized logging functions for pipeline stages.

use std::time::Duration;

/// Log the start of a pipeline stage with consistent format
///
/// # Arguments
/// * `step` - One-based step number
/// * `total` - Total number of steps
/// * `description` - What the stage does
pub fn log_stage_start(step: usize, total: usize, description: &str) {
    log::info!("[Step {step}/{total}] {description}");
}

/// Log the completion of a row-changing stage
///
/// # Arguments
/// * `stage` - Name of the stage
/// * `rows_before` - Row count going in
/// * `rows_after` - Row count coming out
/// * `elapsed` - Optional elapsed time
pub fn log_row_change(stage: &str, rows_before: usize, rows_after: usize, elapsed: Option<Duration>) {
    let removed = rows_before.saturating_sub(rows_after);
    if let Some(duration) = elapsed {
        log::info!(
            "{stage}: {rows_after} of {rows_before} subjects kept ({removed} removed) in {duration:?}"
        );
    } else {
        log::info!("{stage}: {rows_after} of {rows_before} subjects kept ({removed} removed)");
    }
}

/// Log an absorbed data-quality issue
///
/// # Arguments
/// * `message` - Warning message
/// * `columns` - Columns the warning concerns
pub fn log_data_quality(message: &str, columns: &[String]) {
    if columns.is_empty() {
        log::warn!("{message}");
    } else {
        log::warn!("{message}: {}", columns.join(", "));
    }
}
