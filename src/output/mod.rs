//! Output module for frontier reporting
//!
//! This module handles displaying store statistics for `--stats`.

pub mod stats;

pub use stats::{load_statistics, print_statistics, FrontierStatistics};
