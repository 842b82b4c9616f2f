//! Row filters applied to the working table
//!
//! Every filter produces a boolean keep-mask; [`BatchFilter::filter`] applies
//! it. Nulls never satisfy a filter condition.

use std::fmt::Debug;

use arrow::array::{Array, BooleanArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::arrow::{
    boolean_column, cell_as_string, downcast_array, filter_rows, get_column_by_name,
};

/// A filter that can be applied to the working table
pub trait BatchFilter: Debug {
    /// Keep-mask with one entry per row
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Names of the columns this filter reads
    fn required_columns(&self) -> Vec<String>;

    /// Keep only the rows selected by [`BatchFilter::mask`]
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = self.mask(batch)?;
        filter_rows(batch, &mask)
    }
}

/// Removes every subject for whom any of the named indicators is true
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    indicators: Vec<String>,
}

impl ExclusionFilter {
    #[must_use]
    pub const fn new(indicators: Vec<String>) -> Self {
        Self { indicators }
    }
}

impl BatchFilter for ExclusionFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let mut keep = vec![true; batch.num_rows()];
        for name in &self.indicators {
            let indicator = boolean_column(batch, name)?;
            for (row, flag) in keep.iter_mut().enumerate() {
                if indicator.is_valid(row) && indicator.value(row) {
                    *flag = false;
                }
            }
        }
        Ok(BooleanArray::from(keep))
    }

    fn required_columns(&self) -> Vec<String> {
        self.indicators.clone()
    }
}

/// Hard inclusion criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InclusionPredicate {
    /// Keep subjects whose `column` equals `value`.
    ///
    /// Numeric columns are compared numerically, so `"1"` matches `1.0`.
    Equals { column: String, value: String },
}

impl BatchFilter for InclusionPredicate {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let Self::Equals { column, value } = self;
        let array = get_column_by_name(batch, column)?;

        if array.data_type().is_numeric() {
            let Ok(target) = value.trim().parse::<f64>() else {
                return Ok(BooleanArray::from(vec![false; batch.num_rows()]));
            };
            let numbers = cast(&array, &DataType::Float64)?;
            let numbers = downcast_array::<Float64Array>(&numbers, column, "Float64")?;
            return Ok(numbers
                .iter()
                .map(|v| Some(v.is_some_and(|v| v == target)))
                .collect());
        }

        let keep = (0..batch.num_rows())
            .map(|row| Ok(cell_as_string(&array, row)?.is_some_and(|cell| &cell == value)))
            .collect::<Result<Vec<bool>>>()?;
        Ok(BooleanArray::from(keep))
    }

    fn required_columns(&self) -> Vec<String> {
        let Self::Equals { column, .. } = self;
        vec![column.clone()]
    }
}

/// Removes subjects with a null in any of the named columns
#[derive(Debug, Clone)]
pub struct CompletenessFilter {
    columns: Vec<String>,
}

impl CompletenessFilter {
    /// Check the given columns, or every column when `columns` is empty
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn checked_columns(&self, batch: &RecordBatch) -> Vec<String> {
        if self.columns.is_empty() {
            batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect()
        } else {
            self.columns.clone()
        }
    }
}

impl BatchFilter for CompletenessFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let mut keep = vec![true; batch.num_rows()];
        for name in self.checked_columns(batch) {
            let array = get_column_by_name(batch, &name)?;
            if array.null_count() == 0 {
                continue;
            }
            for (row, flag) in keep.iter_mut().enumerate() {
                if array.is_null(row) {
                    *flag = false;
                }
            }
        }
        Ok(BooleanArray::from(keep))
    }

    fn required_columns(&self) -> Vec<String> {
        self.columns.clone()
    }
}
