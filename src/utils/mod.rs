//! Shared utilities
//!
//! - [`arrow`]: column lookup and table restructuring
//! - [`io`]: dated dataset files
//! - [`logging`]: stage logging and progress bars

pub mod arrow;
pub mod io;
pub mod logging;
