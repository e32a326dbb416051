//! Analysis modules.
//!
//! Report aggregation over snapshots of sale records.

pub mod aggregator;

pub use aggregator::*;
