//! Reading of CSV extracts into a single Arrow table.
//!
//! Every cell is read as text; numeric coercion happens later, after
//! indicators and codings have been applied to the raw values. Empty cells
//! become nulls.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::Array;
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};

use crate::catalog::ResolvedColumns;
use crate::error::{CohortError, Result};
use crate::utils::arrow::{drop_columns, rename_columns};

/// Header names of a CSV file, in file order
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(file), Some(0))?;
    Ok(schema.fields().iter().map(|f| f.name().clone()).collect())
}

/// All-text schema for the given column names
fn utf8_schema(columns: &[String]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

/// Read the given column positions of a CSV file as one text batch
fn read_projected(path: &Path, header: &[String], projection: Vec<usize>) -> Result<RecordBatch> {
    let schema: SchemaRef = Arc::new(utf8_schema(header));
    let projected = Arc::new(schema.project(&projection)?);

    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .with_projection(projection)
        .build(File::open(path)?)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&projected, &batches)?)
}

/// Read the extract columns named in `resolved` and rename them to their
/// output names.
///
/// When `drop_empty_columns` is set, columns that are null for every subject
/// are removed from the table and from `resolved`. The id column is always
/// kept.
///
/// # Errors
/// Returns [`CohortError::ColumnNotFound`] when a resolved source column is
/// absent from the file header.
pub fn read_extract(
    path: &Path,
    resolved: &mut ResolvedColumns,
    drop_empty_columns: bool,
) -> Result<RecordBatch> {
    let start = Instant::now();
    info!("Reading extract {}", path.display());

    let header = read_header(path)?;
    let projection = resolved
        .source
        .iter()
        .map(|column| {
            header
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| CohortError::column_not_found(column.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    let raw = read_projected(path, &header, projection)?;
    let mut batch = rename_columns(&raw, &resolved.output)?;
    debug!(
        "Read {} rows x {} columns in {:?}",
        batch.num_rows(),
        batch.num_columns(),
        start.elapsed()
    );

    if drop_empty_columns && batch.num_rows() > 0 {
        let id_column = resolved.id_column().to_string();
        let empty: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .filter(|(field, array)| {
                field.name() != &id_column && array.null_count() == array.len()
            })
            .map(|(field, _)| field.name().clone())
            .collect();

        if !empty.is_empty() {
            warn!("Dropping {} columns with no values", empty.len());
            debug!("Empty columns: {empty:?}");
            batch = drop_columns(&batch, &empty)?;
            resolved.retain_columns(|c| !empty.iter().any(|e| e == c));
        }
    }

    info!(
        "Loaded {} subjects with {} columns from {}",
        batch.num_rows(),
        batch.num_columns(),
        path.display()
    );
    Ok(batch)
}

/// Read every column of a CSV file as text
pub fn read_csv_table(path: &Path) -> Result<RecordBatch> {
    let header = read_header(path)?;
    let projection = (0..header.len()).collect();
    read_projected(path, &header, projection)
}
