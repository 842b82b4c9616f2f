//! Expansion of the catalog into concrete column lists
//!
//! The resolver produces the extract columns to read, the names they are
//! renamed to, and an explicit variable-to-columns grouping so that later
//! stages never need to rediscover array slots by name prefix.

use rustc_hash::FxHashSet;

use crate::catalog::VariableCatalog;
use crate::error::{CohortError, Result};

/// Ordered output columns belonging to one logical variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub variable: String,
    pub columns: Vec<String>,
}

/// Parallel source/output column lists plus the per-variable grouping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    /// Extract column names to read, subject id first
    pub source: Vec<String>,
    /// Output column names, subject id first
    pub output: Vec<String>,
    groups: Vec<ColumnGroup>,
}

impl ResolvedColumns {
    /// Output name of the subject id column
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.output[0]
    }

    /// Output columns of a variable in index order
    #[must_use]
    pub fn columns_for(&self, variable: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.variable == variable)
            .map(|g| g.columns.as_slice())
    }

    /// All groups in catalog order
    #[must_use]
    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    /// Keep only the grouped columns for which `keep` returns true.
    ///
    /// Groups that end up empty are removed. The id column is unaffected.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        for group in &mut self.groups {
            group.columns.retain(|c| keep(c));
        }
        self.groups.retain(|g| !g.columns.is_empty());
    }

    /// Forget the columns of a variable, e.g. after they were replaced by indicators
    pub fn remove_group(&mut self, variable: &str) -> Option<ColumnGroup> {
        let pos = self.groups.iter().position(|g| g.variable == variable)?;
        Some(self.groups.remove(pos))
    }
}

/// Expands a [`VariableCatalog`] into the columns read from the extract
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    id_source: String,
    id_output: String,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new("eid", "id")
    }
}

impl ColumnResolver {
    /// Create a resolver mapping the extract id column `id_source` to `id_output`
    pub fn new(id_source: impl Into<String>, id_output: impl Into<String>) -> Self {
        Self {
            id_source: id_source.into(),
            id_output: id_output.into(),
        }
    }

    /// Resolve all included variables of the catalog
    pub fn resolve(&self, catalog: &VariableCatalog) -> Result<ResolvedColumns> {
        let mut source = vec![self.id_source.clone()];
        let mut output = vec![self.id_output.clone()];
        let mut groups = Vec::new();

        for spec in catalog.included() {
            let spec_output = spec.output_columns();
            source.extend(spec.source_columns());
            output.extend(spec_output.iter().cloned());
            groups.push(ColumnGroup {
                variable: spec.name.clone(),
                columns: spec_output,
            });
        }

        check_correspondence(&source, &output)?;

        Ok(ResolvedColumns {
            source,
            output,
            groups,
        })
    }
}

/// Verify that source and output names correspond one to one
pub(crate) fn check_correspondence(source: &[String], output: &[String]) -> Result<()> {
    let mismatch = |detail: String| CohortError::SchemaMismatch {
        source_count: source.len(),
        output_count: output.len(),
        detail,
    };

    if source.len() != output.len() {
        return Err(mismatch("column counts differ".to_string()));
    }

    let mut seen = FxHashSet::default();
    if let Some(dup) = source.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(mismatch(format!("source column '{dup}' is read twice")));
    }

    seen.clear();
    if let Some(dup) = output.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(mismatch(format!("output column '{dup}' is produced twice")));
    }

    Ok(())
}
