//! Derived numeric features (sums and ratios)

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::config::DerivedFeature;
use crate::error::Result;
use crate::utils::arrow::{append_columns, downcast_array, drop_columns, get_column_by_name};

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = get_column_by_name(batch, name)?;
    let cast = cast(&array, &DataType::Float64)?;
    Ok(downcast_array::<Float64Array>(&cast, name, "Float64")?.clone())
}

fn row_sum(columns: &[Float64Array], rows: usize) -> Float64Array {
    (0..rows)
        .map(|row| {
            columns
                .iter()
                .map(|c| c.is_valid(row).then(|| c.value(row)))
                .sum::<Option<f64>>()
        })
        .collect()
}

fn row_ratio(numerator: &Float64Array, denominator: &Float64Array) -> Float64Array {
    numerator
        .iter()
        .zip(denominator.iter())
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) if d != 0.0 => Some(n / d),
            _ => None,
        })
        .collect()
}

/// Compute one feature
pub fn compute_feature(batch: &RecordBatch, feature: &DerivedFeature) -> Result<ArrayRef> {
    let values = match feature {
        DerivedFeature::Sum { sources, .. } => {
            let columns = sources
                .iter()
                .map(|s| float_column(batch, s))
                .collect::<Result<Vec<_>>>()?;
            row_sum(&columns, batch.num_rows())
        }
        DerivedFeature::Ratio {
            numerator,
            denominator,
            ..
        } => row_ratio(
            &float_column(batch, numerator)?,
            &float_column(batch, denominator)?,
        ),
    };
    Ok(Arc::new(values))
}

/// Append every derived feature in order.
///
/// Features whose sources are all absent from the table (for example
/// dropped as empty) are skipped with a warning. A feature with only some
/// of its sources present is an error.
pub fn apply_derived_features(
    batch: &RecordBatch,
    features: &[DerivedFeature],
) -> Result<RecordBatch> {
    let mut result = batch.clone();

    for feature in features {
        let sources: Vec<&String> = match feature {
            DerivedFeature::Sum { sources, .. } => sources.iter().collect(),
            DerivedFeature::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator, denominator],
        };
        let schema = result.schema();
        if sources.iter().all(|s| schema.index_of(s).is_err()) {
            warn!(
                "Skipping derived feature '{}': none of its source columns are present",
                feature.name()
            );
            continue;
        }

        let values = compute_feature(&result, feature)?;
        result = append_columns(&result, vec![(feature.name().to_string(), values)])?;
        debug!("Derived feature '{}'", feature.name());

        if let DerivedFeature::Sum {
            sources,
            drop_sources: true,
            ..
        } = feature
        {
            result = drop_columns(&result, sources)?;
        }
    }

    Ok(result)
}
