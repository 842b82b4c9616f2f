//! Column-level transformations applied after indicator derivation
//!
//! - [`recode`]: substitute coded values by their labels
//! - [`coerce`]: convert uniformly numeric text columns to numbers
//! - [`features`]: compute sums and ratios from existing columns

pub mod coerce;
pub mod features;
pub mod recode;

pub use coerce::coerce_numeric;
pub use features::apply_derived_features;
pub use recode::{recode_array, recode_variables};
