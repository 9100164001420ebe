//! Chart data derived from the KOI dataset.
//!
//! `aggregator` holds the bucketing and statistics primitives; `charts`
//! assembles them into the dashboard chart suite.

pub mod aggregator;
pub mod charts;

pub use aggregator::*;
pub use charts::{ChartSet, DatasetSnapshot};
