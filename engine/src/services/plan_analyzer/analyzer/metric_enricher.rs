//! Metric enrichment
//!
//! Appends derived metrics (filter ratios, join amplification, cross-join
//! selectivity) to a node's raw metrics and computes exchange, broadcast and
//! codegen durations. Missing inputs omit the derived value instead of failing.

use crate::services::plan_analyzer::AnalyzerOptions;
use crate::services::plan_analyzer::graph::PlanGraph;
use crate::services::plan_analyzer::models::{ExchangeDurations, Metric, NodeId};
use crate::services::plan_analyzer::parser::core::ValueParser;
use std::collections::HashMap;

pub const ROWS_FILTERED: &str = "Rows Filtered";
pub const ROWS_SCANNED: &str = "Rows Scanned";
pub const JOIN_ROWS_INCREASE_RATIO: &str = "join rows increase ratio";
pub const JOIN_ROWS_FILTERED: &str = "join rows filtered";

const SHUFFLE_WRITE_TIME: &str = "shuffle write time";
const FETCH_WAIT_TIME: &str = "fetch wait time";
const REMOTE_REQS_DURATION: &str = "remote reqs duration";
const REMOTE_MERGED_REQS_DURATION: &str = "remote merged reqs duration";

const TIME_TO_BROADCAST: &str = "time to broadcast";
const TIME_TO_BUILD: &str = "time to build";
const TIME_TO_COLLECT: &str = "time to collect";

const CODEGEN_DURATION: &str = "duration";

const CROSS_JOINS: [&str; 2] = ["BroadcastNestedLoopJoin", "CartesianProduct"];
const EQUI_JOINS: [&str; 3] = ["BroadcastHashJoin", "SortMergeJoin", "ShuffledHashJoin"];

/// Derives metrics for nodes of one execution graph
pub struct MetricEnricher<'a> {
    graph: &'a PlanGraph,
    metrics_by_node: HashMap<NodeId, &'a [Metric]>,
    options: &'a AnalyzerOptions,
}

impl<'a> MetricEnricher<'a> {
    pub fn new(
        graph: &'a PlanGraph,
        metrics_by_node: HashMap<NodeId, &'a [Metric]>,
        options: &'a AnalyzerOptions,
    ) -> Self {
        Self { graph, metrics_by_node, options }
    }

    /// Raw metrics followed by the derived ones that apply to this node
    pub fn enrich(
        &self,
        node_id: NodeId,
        normalized_name: &str,
        display_name: &str,
        raw: &[Metric],
    ) -> Vec<Metric> {
        let mut metrics = raw.to_vec();

        if CROSS_JOINS.contains(&normalized_name) {
            metrics.extend(self.cross_join_metrics(node_id, raw));
        } else if EQUI_JOINS.contains(&normalized_name) {
            metrics.extend(self.join_amplification(node_id, raw));
        } else if normalized_name.contains("Filter") || display_name == "Distinct" {
            metrics.extend(self.filter_ratio(node_id, raw));
        }

        metrics
    }

    /// Value of the first recognised row-count metric, if it parses
    pub fn row_count(&self, metrics: &[Metric]) -> Option<u64> {
        metrics
            .iter()
            .find(|m| self.options.is_row_count_metric(&m.name))
            .and_then(|m| ValueParser::parse_count(&m.value).ok())
    }

    fn node_row_count(&self, node_id: NodeId) -> Option<u64> {
        self.metrics_by_node.get(&node_id).and_then(|metrics| self.row_count(metrics))
    }

    /// Row count of `start` or, failing that, of the nearest ancestor reached
    /// through first predecessors. Bounded by the node count.
    fn row_count_at_or_above(&self, start: NodeId) -> Option<u64> {
        let mut current = start;
        for _ in 0..=self.graph.node_count() {
            if let Some(rows) = self.node_row_count(current) {
                return Some(rows);
            }
            current = *self.graph.predecessors(current).first()?;
        }
        None
    }

    fn upstream_row_count(&self, node_id: NodeId) -> Option<u64> {
        let first = *self.graph.predecessors(node_id).first()?;
        self.row_count_at_or_above(first)
    }

    fn filter_ratio(&self, node_id: NodeId, raw: &[Metric]) -> Option<Metric> {
        let input_rows = self.upstream_row_count(node_id).unwrap_or(0);
        if input_rows == 0 {
            return None;
        }
        let output_rows = self.row_count(raw)?;
        let filtered = percentage(input_rows.saturating_sub(output_rows), input_rows);
        Some(Metric::new(ROWS_FILTERED, ValueParser::format_percentage(filtered)))
    }

    fn cross_join_metrics(&self, node_id: NodeId, raw: &[Metric]) -> Vec<Metric> {
        let inputs = self.graph.predecessors(node_id);
        let [left, right] = inputs.as_slice() else {
            return vec![];
        };
        let (Some(left_rows), Some(right_rows)) = (self.node_row_count(*left), self.node_row_count(*right))
        else {
            return vec![];
        };

        let scanned = left_rows.saturating_mul(right_rows);
        let mut derived = vec![Metric::new(ROWS_SCANNED, ValueParser::format_count(scanned))];
        if scanned > 0
            && let Some(output_rows) = self.row_count(raw)
        {
            let filtered = 100.0 - percentage(output_rows, scanned);
            derived.push(Metric::new(ROWS_FILTERED, ValueParser::format_percentage(filtered)));
        }
        derived
    }

    fn join_amplification(&self, node_id: NodeId, raw: &[Metric]) -> Option<Metric> {
        let inputs = self.graph.predecessors(node_id);
        let [left, right] = inputs.as_slice() else {
            return None;
        };
        let output_rows = self.row_count(raw)?;
        let max_input = self
            .row_count_at_or_above(*left)
            .unwrap_or(0)
            .max(self.row_count_at_or_above(*right).unwrap_or(0));

        let ratio = if max_input == 0 { 0.0 } else { output_rows as f64 / max_input as f64 };
        if ratio > 1.0 {
            Some(Metric::new(JOIN_ROWS_INCREASE_RATIO, ValueParser::format_ratio(ratio)))
        } else {
            Some(Metric::new(JOIN_ROWS_FILTERED, ValueParser::format_percentage(ratio * 100.0)))
        }
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

/// Duration metric in milliseconds, 0 when absent or malformed
fn duration_metric(metrics: &[Metric], name: &str) -> f64 {
    metrics
        .iter()
        .find(|m| m.name == name)
        .and_then(|m| ValueParser::parse_duration_ms(&m.value).ok())
        .unwrap_or(0.0)
}

/// Shuffle write/read split, only for nodes named exactly `Exchange`
pub fn exchange_durations(normalized_name: &str, metrics: &[Metric]) -> Option<ExchangeDurations> {
    if normalized_name != "Exchange" {
        return None;
    }
    let write_duration = duration_metric(metrics, SHUFFLE_WRITE_TIME);
    let read_duration = duration_metric(metrics, FETCH_WAIT_TIME)
        + duration_metric(metrics, REMOTE_REQS_DURATION)
        + duration_metric(metrics, REMOTE_MERGED_REQS_DURATION);

    Some(ExchangeDurations {
        write_duration,
        read_duration,
        duration: write_duration + read_duration,
    })
}

/// Broadcast duration of a `BroadcastExchange`.
///
/// Only the broadcast time is reported. Build and collect times are read but not added.
pub fn broadcast_duration(normalized_name: &str, metrics: &[Metric]) -> Option<f64> {
    if normalized_name != "BroadcastExchange" {
        return None;
    }
    let broadcast = duration_metric(metrics, TIME_TO_BROADCAST);
    let _build = duration_metric(metrics, TIME_TO_BUILD);
    let _collect = duration_metric(metrics, TIME_TO_COLLECT);
    Some(broadcast)
}

/// Total time of a codegen wrapper from its `duration` metric
pub fn codegen_duration(metrics: &[Metric]) -> Option<f64> {
    metrics
        .iter()
        .find(|m| m.name == CODEGEN_DURATION)
        .and_then(|m| ValueParser::parse_duration_ms(&m.value).ok())
}
