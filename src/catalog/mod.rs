//! Declarative variable catalog
//!
//! The catalog maps logical variable names onto extract fields. Each entry
//! names the source field id, the instance, the range of array indices to
//! read, whether the variable is part of the build, and an optional
//! value-to-label coding table.
//!
//! Catalogs are loaded from JSON documents of the form
//!
//! ```json
//! {
//!     "sex": {
//!         "DataField": 31,
//!         "InstanceNum": 0,
//!         "ArrayRange": {"start": 0, "stop": 1, "step": 1},
//!         "Included": true,
//!         "Coding": {"0": "Female", "1": "Male"}
//!     }
//! }
//! ```

pub mod resolver;

use std::fs;
use std::path::Path;

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};

pub use resolver::{ColumnGroup, ColumnResolver, ResolvedColumns};

/// Raw value to label substitution table
pub type Coding = FxHashMap<String, String>;

/// Half-open range of array indices (`start..stop` by `step`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: u32,
    pub stop: u32,
    #[serde(default = "default_step")]
    pub step: u32,
}

const fn default_step() -> u32 {
    1
}

impl IndexRange {
    /// Range with unit step
    #[must_use]
    pub const fn new(start: u32, stop: u32) -> Self {
        Self {
            start,
            stop,
            step: 1,
        }
    }

    /// Range covering a single index
    #[must_use]
    pub const fn single(index: u32) -> Self {
        Self::new(index, index + 1)
    }

    /// Iterate the indices in order
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        (self.start..self.stop).step_by(self.step.max(1) as usize)
    }

    /// Number of indices in the range
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices().count()
    }

    /// Whether the range yields no indices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.step == 0 || self.start >= self.stop
    }
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Logical variable name, used as the output column name (or prefix)
    pub name: String,
    /// Field identifier in the extract
    pub source_field_id: u32,
    /// Instance (assessment visit) number
    pub instance: u32,
    /// Array indices to read
    pub index_range: IndexRange,
    /// Whether the variable is part of the build
    pub included: bool,
    /// Optional value-to-label recoding table
    pub coding: Option<Coding>,
}

impl VariableSpec {
    /// Create an included, uncoded variable
    pub fn new(
        name: impl Into<String>,
        source_field_id: u32,
        instance: u32,
        index_range: IndexRange,
    ) -> Self {
        Self {
            name: name.into(),
            source_field_id,
            instance,
            index_range,
            included: true,
            coding: None,
        }
    }

    /// Attach a coding table
    #[must_use]
    pub fn with_coding<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.coding = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Mark the variable as excluded from the build
    #[must_use]
    pub const fn excluded(mut self) -> Self {
        self.included = false;
        self
    }

    /// Whether the variable expands to more than one column
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.index_range.len() > 1
    }

    /// Extract column names, one per index (`<fieldId>-<instance>.<index>`)
    #[must_use]
    pub fn source_columns(&self) -> Vec<String> {
        self.index_range
            .indices()
            .map(|i| format!("{}-{}.{}", self.source_field_id, self.instance, i))
            .collect()
    }

    /// Output column names: the bare name for single-index variables,
    /// `<name><index>` otherwise
    #[must_use]
    pub fn output_columns(&self) -> Vec<String> {
        if self.is_array() {
            self.index_range
                .indices()
                .map(|i| format!("{}{}", self.name, i))
                .collect()
        } else {
            vec![self.name.clone()]
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CohortError::Catalog(
                "variable with empty name".to_string(),
            ));
        }
        if self.index_range.is_empty() {
            return Err(CohortError::Catalog(format!(
                "variable '{}' has an empty index range {}..{} step {}",
                self.name, self.index_range.start, self.index_range.stop, self.index_range.step
            )));
        }
        Ok(())
    }
}

/// JSON shape of a catalog entry
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "DataField")]
    data_field: u32,
    #[serde(rename = "InstanceNum")]
    instance_num: u32,
    #[serde(rename = "ArrayRange")]
    array_range: IndexRange,
    #[serde(rename = "Included")]
    included: bool,
    #[serde(rename = "Coding", default)]
    coding: Option<Coding>,
}

/// Ordered registry of variable specifications
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    variables: Vec<VariableSpec>,
    index: FxHashMap<String, usize>,
}

impl VariableCatalog {
    /// Build a catalog from specs, rejecting empty ranges and duplicate names
    pub fn new(variables: Vec<VariableSpec>) -> Result<Self> {
        let mut catalog = Self::default();
        for spec in variables {
            spec.validate()?;
            if catalog.index.contains_key(&spec.name) {
                return Err(CohortError::Catalog(format!(
                    "duplicate variable '{}'",
                    spec.name
                )));
            }
            catalog.insert(spec);
        }
        Ok(catalog)
    }

    /// Parse a catalog from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        catalog.merge_entries(entries)?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_files(&[path])
    }

    /// Load and merge several JSON catalog files in order.
    ///
    /// Later files override earlier entries with the same name, keeping the
    /// position of the first declaration.
    pub fn from_json_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut catalog = Self::default();
        for path in paths {
            let path = path.as_ref();
            let content = fs::read_to_string(path)?;
            let entries: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&content)?;
            debug!(
                "Loaded {} catalog entries from {}",
                entries.len(),
                path.display()
            );
            catalog.merge_entries(entries)?;
        }
        Ok(catalog)
    }

    fn merge_entries(&mut self, entries: serde_json::Map<String, serde_json::Value>) -> Result<()> {
        for (name, value) in entries {
            let entry: CatalogEntry = serde_json::from_value(value).map_err(|e| {
                CohortError::Catalog(format!("invalid entry for variable '{name}': {e}"))
            })?;
            let spec = VariableSpec {
                name,
                source_field_id: entry.data_field,
                instance: entry.instance_num,
                index_range: entry.array_range,
                included: entry.included,
                coding: entry.coding,
            };
            spec.validate()?;
            self.insert(spec);
        }
        Ok(())
    }

    /// Insert a spec, replacing any existing spec of the same name in place
    pub fn insert(&mut self, spec: VariableSpec) {
        if let Some(&pos) = self.index.get(&spec.name) {
            self.variables[pos] = spec;
        } else {
            self.index.insert(spec.name.clone(), self.variables.len());
            self.variables.push(spec);
        }
    }

    /// Look up a variable by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VariableSpec> {
        self.index.get(name).map(|&pos| &self.variables[pos])
    }

    /// Coding table of a variable, if it has one
    #[must_use]
    pub fn coding(&self, name: &str) -> Option<&Coding> {
        self.get(name).and_then(|spec| spec.coding.as_ref())
    }

    /// All variables in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &VariableSpec> {
        self.variables.iter()
    }

    /// Included variables in declaration order
    pub fn included(&self) -> impl Iterator<Item = &VariableSpec> {
        self.variables.iter().filter(|spec| spec.included)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
