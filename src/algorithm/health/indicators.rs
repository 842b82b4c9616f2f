//! Boolean indicator derivation from multi-valued array variables
//!
//! An array variable (e.g. `diagnoses0..diagnosesN`) holds one value per
//! slot, most of them empty. Each [`IndicatorRule`] becomes a boolean column
//! that is true when the rule's pattern matches the start of any non-empty
//! slot of that subject.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use regex::Regex;

use crate::catalog::{Coding, ResolvedColumns, VariableCatalog};
use crate::config::{IndicatorGroup, IndicatorRule};
use crate::error::{CohortError, Result};
use crate::utils::arrow::{append_columns, drop_columns, get_column_by_name, string_column};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Indicator rule with its compiled, start-anchored pattern
#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    regex: Regex,
}

/// Derives indicator columns for one indicator group
#[derive(Debug, Clone)]
pub struct IndicatorDeriver {
    group: String,
    rules: Vec<CompiledRule>,
    show_progress: bool,
}

impl IndicatorDeriver {
    /// Compile the rules of a group.
    ///
    /// Patterns match at the start of a value, so `F2\d` matches `F20` and
    /// `F209` but not `XF20`.
    pub fn new(group: impl Into<String>, rules: &[IndicatorRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&format!("^(?:{})", rule.pattern))
                    .map(|regex| CompiledRule {
                        name: rule.name.clone(),
                        regex,
                    })
                    .map_err(|source| CohortError::InvalidPattern {
                        indicator: rule.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            group: group.into(),
            rules,
            show_progress: false,
        })
    }

    /// Draw a progress bar while scanning subjects
    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Names of the indicator columns, in rule order
    pub fn indicator_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Derive a table of `[id, indicator...]` with one row per subject.
    ///
    /// `source_columns` are the group's array slots present in `batch`. When
    /// `coding` is given, slot values are mapped to their labels before
    /// matching; values without a label never match.
    ///
    /// # Errors
    /// Returns [`CohortError::DerivationIntegrity`] when the derived table
    /// does not hold exactly one id and one value per rule for every subject.
    pub fn derive(
        &self,
        batch: &RecordBatch,
        id_column: &str,
        source_columns: &[String],
        coding: Option<&Coding>,
    ) -> Result<RecordBatch> {
        let start = Instant::now();
        let rows = batch.num_rows();
        let slots = source_columns
            .iter()
            .map(|c| string_column(batch, c))
            .collect::<Result<Vec<StringArray>>>()?;

        let pb = create_main_progress_bar(
            rows as u64,
            Some(&format!("Deriving {} indicators", self.group)),
            self.show_progress,
        );

        let mut flags: Vec<Vec<bool>> = vec![Vec::with_capacity(rows); self.rules.len()];
        for row in 0..rows {
            let values: Vec<&str> = slots
                .iter()
                .filter(|slot| slot.is_valid(row))
                .filter_map(|slot| {
                    let raw = slot.value(row);
                    match coding {
                        Some(coding) => coding.get(raw).map(String::as_str),
                        None => Some(raw),
                    }
                })
                .collect();

            for (rule, column) in self.rules.iter().zip(flags.iter_mut()) {
                column.push(values.iter().any(|v| rule.regex.is_match(v)));
            }
            pb.inc(1);
        }
        finish_progress_bar(&pb, Some("Indicators derived"));

        let ids = get_column_by_name(batch, id_column)?;
        let produced = ids.len() + flags.iter().map(Vec::len).sum::<usize>();
        let expected = rows * (1 + self.rules.len());
        if produced != expected {
            return Err(CohortError::DerivationIntegrity {
                group: self.group.clone(),
                produced,
                expected,
            });
        }

        let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(self.rules.len() + 1);
        columns.push((id_column.to_string(), ids));
        for (rule, values) in self.rules.iter().zip(flags) {
            let positives = values.iter().filter(|&&v| v).count();
            debug!("{}: {positives} of {rows} subjects", rule.name);
            columns.push((rule.name.clone(), Arc::new(BooleanArray::from(values)) as ArrayRef));
        }

        debug!(
            "Derived {} indicators from {} columns in {:?}",
            self.rules.len(),
            source_columns.len(),
            start.elapsed()
        );

        let (names, arrays): (Vec<_>, Vec<_>) = columns.into_iter().unzip();
        let fields: Vec<Field> = names
            .iter()
            .zip(&arrays)
            .map(|(name, array)| Field::new(name, array.data_type().clone(), true))
            .collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

/// Derive one group's indicators and attach them to the table.
///
/// Indicators are appended in rule order. With `drop_target` set, the slot
/// columns are removed from the table and from `resolved`. A variable with
/// no columns left in the table yields all-false indicators.
pub fn apply_indicator_group(
    batch: &RecordBatch,
    group: &IndicatorGroup,
    resolved: &mut ResolvedColumns,
    catalog: &VariableCatalog,
    show_progress: bool,
) -> Result<RecordBatch> {
    let id_column = resolved.id_column().to_string();
    let columns: Vec<String> = resolved
        .columns_for(&group.variable)
        .map(<[String]>::to_vec)
        .unwrap_or_default();

    if columns.is_empty() {
        warn!(
            "No columns available for '{}'; its indicators will all be false",
            group.variable
        );
    }

    let coding = if group.match_labels {
        let coding = catalog.coding(&group.variable);
        if coding.is_none() {
            warn!(
                "'{}' has no coding; matching raw values instead of labels",
                group.variable
            );
        }
        coding
    } else {
        None
    };

    let deriver = IndicatorDeriver::new(&group.variable, &group.rules)?.with_progress(show_progress);
    let derived = deriver.derive(batch, &id_column, &columns, coding)?;

    let indicators: Vec<(String, ArrayRef)> = derived
        .schema()
        .fields()
        .iter()
        .zip(derived.columns())
        .skip(1)
        .map(|(field, array)| (field.name().clone(), array.clone()))
        .collect();
    let mut result = append_columns(batch, indicators)?;

    if group.drop_target {
        result = drop_columns(&result, &columns)?;
        resolved.remove_group(&group.variable);
    }

    info!(
        "Derived {} indicators from '{}' ({} columns)",
        group.rules.len(),
        group.variable,
        columns.len()
    );
    Ok(result)
}
