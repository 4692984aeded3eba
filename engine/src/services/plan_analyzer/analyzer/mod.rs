//! Plan analyzer module
//!
//! Derives secondary metrics from the raw counters reported per node.

pub mod metric_enricher;

pub use metric_enricher::{MetricEnricher, broadcast_duration, codegen_duration, exchange_durations};
