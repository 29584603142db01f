//! Analysis modules.
//!
//! This module contains the aggregation step that condenses a site's
//! repeated audit runs into a single summary sample.

pub mod aggregator;

pub use aggregator::*;
