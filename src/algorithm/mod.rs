//! Algorithm implementations for cohort construction
//!
//! This module contains the diagnosis indicator and classification logic,
//! population filtering, and case-control matching.

pub mod health;
pub mod matching;
pub mod population;
