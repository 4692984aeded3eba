//! Plan/SQL aggregator
//!
//! Runs classification, parsing, contraction and metric enrichment per execution,
//! and merges new snapshots and metric pushes into the execution store.
//!
//! Merge rules for a snapshot of execution `E`:
//!
//! | stored state      | snapshot                       | action                                |
//! |-------------------|--------------------------------|---------------------------------------|
//! | absent            | any                            | materialize, fresh stable id          |
//! | running           | completed / failed             | materialize, keep stable id           |
//! | running           | running, node count changed    | materialize, keep stable id           |
//! | running           | running, node count unchanged  | copy duration and job id lists only   |
//! | completed/failed  | any                            | ignored                               |

use crate::services::plan_analyzer::AnalyzerOptions;
use crate::services::plan_analyzer::analyzer::{
    MetricEnricher, broadcast_duration, codegen_duration, exchange_durations,
};
use crate::services::plan_analyzer::classifier::NodeClassifier;
use crate::services::plan_analyzer::graph::{PlanGraph, build_tiers};
use crate::services::plan_analyzer::identity::IdentityGenerator;
use crate::services::plan_analyzer::models::*;
use crate::services::plan_analyzer::parser::OperatorParser;
use std::collections::HashMap;
use tracing::{debug, warn};

const IN_MEMORY_TABLE_SCAN: &str = "InMemoryTableScan";

pub struct PlanAggregator<'a> {
    options: &'a AnalyzerOptions,
    ids: &'a dyn IdentityGenerator,
}

impl<'a> PlanAggregator<'a> {
    pub fn new(options: &'a AnalyzerOptions, ids: &'a dyn IdentityGenerator) -> Self {
        Self { options, ids }
    }

    /// Merge a batch of snapshots into `store`.
    ///
    /// Executions absent from the batch are carried over untouched. That holds for
    /// ids below the batch minimum and for ids inside the batch's range alike.
    pub fn update_store(
        &self,
        store: ExecutionStore,
        snapshots: &[SqlSnapshot],
        context: &EnrichmentContext,
    ) -> ExecutionStore {
        if snapshots.is_empty() {
            return store;
        }

        let mut by_id: HashMap<String, Execution> =
            store.executions.into_iter().map(|e| (e.id.clone(), e)).collect();

        for snapshot in snapshots {
            let merged = match by_id.remove(&snapshot.id) {
                None => {
                    debug!("Execution {}: first observed, materializing", snapshot.id);
                    self.materialize(snapshot, context, None)
                }
                Some(existing) if existing.status.is_terminal() => {
                    debug!("Execution {}: already {:?}, snapshot ignored", snapshot.id, existing.status);
                    existing
                }
                Some(existing) if snapshot.status.is_terminal() => {
                    debug!("Execution {}: finished as {:?}, re-materializing", snapshot.id, snapshot.status);
                    self.materialize(snapshot, context, Some(existing.stable_unique_id))
                }
                Some(existing) if snapshot.nodes.len() != existing.original_node_count => {
                    debug!(
                        "Execution {}: node count {} -> {}, re-materializing",
                        snapshot.id,
                        existing.original_node_count,
                        snapshot.nodes.len()
                    );
                    self.materialize(snapshot, context, Some(existing.stable_unique_id))
                }
                Some(existing) => {
                    debug!("Execution {}: running, volatile fields only", snapshot.id);
                    Self::copy_volatile_fields(existing, snapshot)
                }
            };
            by_id.insert(merged.id.clone(), merged);
        }

        let mut executions: Vec<Execution> = by_id.into_values().collect();
        executions.sort_by(|a, b| execution_order_key(&a.id).cmp(&execution_order_key(&b.id)));
        ExecutionStore { executions }
    }

    fn copy_volatile_fields(mut execution: Execution, snapshot: &SqlSnapshot) -> Execution {
        execution.duration = snapshot.duration;
        execution.running_job_ids = snapshot.running_job_ids.clone();
        execution.success_job_ids = snapshot.success_job_ids.clone();
        execution.failed_job_ids = snapshot.failed_job_ids.clone();
        execution
    }

    /// Run the full pipeline over one snapshot
    pub fn materialize(
        &self,
        snapshot: &SqlSnapshot,
        context: &EnrichmentContext,
        stable_unique_id: Option<String>,
    ) -> Execution {
        let descriptions: HashMap<NodeId, &str> = context
            .plans
            .get(&snapshot.id)
            .map(|plans| plans.iter().map(|p| (p.id, p.plan_description.as_str())).collect())
            .unwrap_or_default();

        let mut nodes = Vec::new();
        let mut codegen_nodes = Vec::new();
        for raw in &snapshot.nodes {
            let node = self.classify_node(&snapshot.id, raw, descriptions.get(&raw.node_id).copied());
            if node.is_codegen_node {
                codegen_nodes.push(node);
            } else {
                nodes.push(node);
            }
        }

        let graph = PlanGraph::build(&snapshot.edges, nodes.iter().map(|n| n.node_id));
        let commit = context.commits.get(&snapshot.id);
        let is_single_node = snapshot.nodes.len() == 1;

        if is_single_node {
            for node in nodes.iter_mut() {
                if matches!(node.category, NodeCategory::Input | NodeCategory::Output) {
                    node.category = NodeCategory::Other;
                }
                node.commit = commit.cloned();
            }
        } else {
            self.force_output_node(&mut nodes, &graph);
            if let Some(output) = nodes.iter_mut().rev().find(|n| n.category == NodeCategory::Output) {
                output.commit = commit.cloned();
            }
        }

        Self::attach_cached_storage(&mut nodes, &context.storage);
        self.enrich_nodes(&mut nodes, &graph);

        for node in codegen_nodes.iter_mut() {
            node.duration = codegen_duration(&node.metrics);
        }

        let edges = graph.edges().to_vec();
        let filter_tiers = build_tiers(&nodes, &edges, self.options);

        Execution {
            id: snapshot.id.clone(),
            status: snapshot.status,
            description: snapshot.description.clone(),
            submission_time: snapshot.submission_time.clone(),
            duration: snapshot.duration,
            running_job_ids: snapshot.running_job_ids.clone(),
            success_job_ids: snapshot.success_job_ids.clone(),
            failed_job_ids: snapshot.failed_job_ids.clone(),
            original_node_count: snapshot.nodes.len(),
            is_single_node,
            nodes,
            edges,
            filter_tiers,
            codegen_nodes,
            stable_unique_id: stable_unique_id.unwrap_or_else(|| self.ids.fresh_id()),
            metric_revision_id: self.ids.fresh_id(),
        }
    }

    fn classify_node(&self, execution_id: &str, raw: &RawNode, description: Option<&str>) -> PlanNode {
        let normalized_name = NodeClassifier::normalize_name(&raw.node_name);
        let is_codegen_node = NodeClassifier::is_codegen_wrapper(&normalized_name);

        let parsed_plan = match description {
            Some(text) if !is_codegen_node => match OperatorParser::parse(&normalized_name, text) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(
                        "Execution {}: failed to parse plan of node {} ({}): {}",
                        execution_id, raw.node_id, raw.node_name, e
                    );
                    None
                }
            },
            _ => None,
        };

        let (category, codegen_group_id) = if is_codegen_node {
            let group = NodeClassifier::codegen_group_id(&normalized_name).or(raw.whole_stage_codegen_id);
            (NodeCategory::Other, group)
        } else {
            (NodeClassifier::classify_normalized(&normalized_name), raw.whole_stage_codegen_id)
        };

        PlanNode {
            node_id: raw.node_id,
            node_name: raw.node_name.clone(),
            display_name: NodeClassifier::display_name(&normalized_name, parsed_plan.as_ref()),
            normalized_name,
            category,
            parsed_plan,
            metrics: raw.metrics.clone(),
            is_codegen_node,
            codegen_group_id,
            stage_id: raw.stage_id,
            exchange_durations: None,
            duration: None,
            commit: None,
            cached_storage: None,
        }
    }

    /// Reassign the last visible, non-wrapper node to output when nothing else is one.
    /// Only applied to a single connected plan.
    fn force_output_node(&self, nodes: &mut [PlanNode], graph: &PlanGraph) {
        if nodes.iter().any(|n| n.category == NodeCategory::Output) || !graph.is_weakly_connected() {
            return;
        }
        let candidate = nodes.iter_mut().rev().find(|n| {
            !NodeClassifier::is_wrapper(&n.normalized_name) && !self.options.is_hidden(&n.normalized_name)
        });
        if let Some(last) = candidate {
            debug!("Forcing node {} ({}) to output", last.node_id, last.node_name);
            last.category = NodeCategory::Output;
        }
    }

    /// The k-th in-memory scan of a stage gets the stage's k-th cached storage entry
    fn attach_cached_storage(nodes: &mut [PlanNode], storage: &HashMap<i64, Vec<CachedStorage>>) {
        let mut seen_per_stage: HashMap<i64, usize> = HashMap::new();
        for node in nodes.iter_mut().filter(|n| n.normalized_name == IN_MEMORY_TABLE_SCAN) {
            let Some(stage_id) = node.stage_id else {
                continue;
            };
            let index = seen_per_stage.entry(stage_id).or_insert(0);
            node.cached_storage = storage.get(&stage_id).and_then(|entries| entries.get(*index)).cloned();
            *index += 1;
        }
    }

    fn enrich_nodes(&self, nodes: &mut [PlanNode], graph: &PlanGraph) {
        let derived: Vec<(Vec<Metric>, Option<ExchangeDurations>, Option<f64>)> = {
            let metrics_by_node = nodes.iter().map(|n| (n.node_id, n.metrics.as_slice())).collect();
            let enricher = MetricEnricher::new(graph, metrics_by_node, self.options);
            nodes
                .iter()
                .map(|n| Self::derive(&enricher, n, &n.metrics))
                .collect()
        };

        for (node, (metrics, exchange, duration)) in nodes.iter_mut().zip(derived) {
            node.metrics = metrics;
            node.exchange_durations = exchange;
            node.duration = duration;
        }
    }

    fn derive(
        enricher: &MetricEnricher<'_>,
        node: &PlanNode,
        raw: &[Metric],
    ) -> (Vec<Metric>, Option<ExchangeDurations>, Option<f64>) {
        (
            enricher.enrich(node.node_id, &node.normalized_name, &node.display_name, raw),
            exchange_durations(&node.normalized_name, raw),
            broadcast_duration(&node.normalized_name, raw),
        )
    }

    /// Merge a metric push into the matching execution. Unknown ids leave the store unchanged.
    pub fn apply_metrics(&self, mut store: ExecutionStore, update: &ExecutionMetricsUpdate) -> ExecutionStore {
        let updates: HashMap<NodeId, &[Metric]> =
            update.nodes.iter().map(|n| (n.id, n.metrics.as_slice())).collect();
        if updates.is_empty() {
            return store;
        }

        let Some(execution) = store.executions.iter_mut().find(|e| e.id == update.execution_id) else {
            debug!("Metric update for unknown execution {}, ignored", update.execution_id);
            return store;
        };

        let graph = PlanGraph::build(&execution.edges, execution.nodes.iter().map(|n| n.node_id));
        let derived: Vec<(usize, (Vec<Metric>, Option<ExchangeDurations>, Option<f64>))> = {
            let metrics_by_node = execution
                .nodes
                .iter()
                .map(|n| (n.node_id, updates.get(&n.node_id).copied().unwrap_or(n.metrics.as_slice())))
                .collect();
            let enricher = MetricEnricher::new(&graph, metrics_by_node, self.options);
            execution
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| updates.get(&n.node_id).map(|raw| (i, Self::derive(&enricher, n, raw))))
                .collect()
        };

        let mut changed = !derived.is_empty();
        for (index, (metrics, exchange, duration)) in derived {
            let node = &mut execution.nodes[index];
            node.metrics = metrics;
            node.exchange_durations = exchange;
            node.duration = duration;
        }

        for node in execution.codegen_nodes.iter_mut() {
            if let Some(raw) = updates.get(&node.node_id) {
                node.metrics = raw.to_vec();
                node.duration = codegen_duration(raw);
                changed = true;
            }
        }

        if changed {
            execution.metric_revision_id = self.ids.fresh_id();
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::identity::SequenceIdGenerator;

    fn raw(node_id: NodeId, name: &str, rows: Option<&str>) -> RawNode {
        RawNode {
            node_id,
            node_name: name.to_string(),
            metrics: rows
                .map(|r| vec![Metric::new("number of output rows", r)])
                .unwrap_or_default(),
            whole_stage_codegen_id: None,
            stage_id: None,
        }
    }

    fn snapshot(id: &str, status: ExecutionStatus, nodes: Vec<RawNode>, edges: &[(NodeId, NodeId)]) -> SqlSnapshot {
        SqlSnapshot {
            id: id.to_string(),
            status,
            description: format!("query {}", id),
            submission_time: None,
            duration: 0.0,
            running_job_ids: vec![],
            success_job_ids: vec![],
            failed_job_ids: vec![],
            nodes,
            edges: edges.iter().map(|(f, t)| PlanEdge::new(*f, *t)).collect(),
        }
    }

    fn chain(id: &str, status: ExecutionStatus) -> SqlSnapshot {
        snapshot(
            id,
            status,
            vec![
                raw(0, "Scan parquet db.t", Some("100")),
                raw(1, "Filter", Some("40")),
                raw(2, "Project", None),
            ],
            &[(0, 1), (1, 2)],
        )
    }

    #[test]
    fn test_last_node_forced_to_output() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);

        let execution = aggregator.materialize(&chain("1", ExecutionStatus::Completed), &EnrichmentContext::default(), None);
        let categories: Vec<NodeCategory> = execution.nodes.iter().map(|n| n.category).collect();
        assert_eq!(
            categories,
            vec![NodeCategory::Input, NodeCategory::Transformation, NodeCategory::Output]
        );
    }

    #[test]
    fn test_wrapper_is_never_forced_to_output() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let snap = snapshot(
            "1",
            ExecutionStatus::Completed,
            vec![raw(0, "LocalTableScan", None), raw(1, "Project", None), raw(2, "AdaptiveSparkPlan", None)],
            &[(0, 1), (1, 2)],
        );

        let execution = aggregator.materialize(&snap, &EnrichmentContext::default(), None);
        assert_eq!(execution.node(1).unwrap().category, NodeCategory::Output);
        assert_eq!(execution.node(2).unwrap().category, NodeCategory::Other);
    }

    #[test]
    fn test_hidden_plumbing_is_never_forced_to_output() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let snap = snapshot(
            "1",
            ExecutionStatus::Completed,
            vec![
                raw(0, "CometScan parquet db.t", Some("100")),
                raw(1, "CometHashAggregate", Some("10")),
                raw(2, "ColumnarToRow", None),
            ],
            &[(0, 1), (1, 2)],
        );

        let execution = aggregator.materialize(&snap, &EnrichmentContext::default(), None);
        assert_eq!(execution.node(1).unwrap().category, NodeCategory::Output);
        assert_eq!(execution.node(2).unwrap().category, NodeCategory::Other);
        let io = &execution.filter_tiers.io;
        assert_eq!(io.visible_node_ids.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(io.edges, vec![PlanEdge::new(0, 1)]);
    }

    #[test]
    fn test_disconnected_plan_not_forced() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let snap = snapshot(
            "1",
            ExecutionStatus::Completed,
            vec![raw(0, "Filter", None), raw(1, "Project", None)],
            &[],
        );

        let execution = aggregator.materialize(&snap, &EnrichmentContext::default(), None);
        assert!(execution.nodes.iter().all(|n| n.category != NodeCategory::Output));
    }

    #[test]
    fn test_single_node_execution_carries_commit() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let snap = snapshot(
            "7",
            ExecutionStatus::Completed,
            vec![raw(0, "Execute InsertIntoHadoopFsRelationCommand", None)],
            &[],
        );
        let mut context = EnrichmentContext::default();
        context.commits.insert(
            "7".to_string(),
            CommitInfo {
                table_name: "db.events".to_string(),
                commit_id: 3,
                operation: "WRITE".to_string(),
                metrics: HashMap::new(),
            },
        );

        let execution = aggregator.materialize(&snap, &context, None);
        assert!(execution.is_single_node);
        let node = &execution.nodes[0];
        assert_eq!(node.category, NodeCategory::Other);
        assert_eq!(node.commit.as_ref().map(|c| c.commit_id), Some(3));
    }

    #[test]
    fn test_cached_storage_by_position_within_stage() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);

        let mut first = raw(0, "InMemoryTableScan", None);
        first.stage_id = Some(4);
        let mut second = raw(1, "InMemoryTableScan", None);
        second.stage_id = Some(4);
        let snap = snapshot(
            "1",
            ExecutionStatus::Completed,
            vec![first, second, raw(2, "Union", None)],
            &[(0, 2), (1, 2)],
        );

        let storage_entry = |rdd_id| CachedStorage {
            rdd_id,
            storage_level: "MEMORY_AND_DISK".to_string(),
            memory_used: 1024,
            disk_used: 0,
            num_partitions: 8,
        };
        let mut context = EnrichmentContext::default();
        context.storage.insert(4, vec![storage_entry(10), storage_entry(11)]);

        let execution = aggregator.materialize(&snap, &context, None);
        assert_eq!(execution.node(0).unwrap().cached_storage.as_ref().map(|s| s.rdd_id), Some(10));
        assert_eq!(execution.node(1).unwrap().cached_storage.as_ref().map(|s| s.rdd_id), Some(11));
    }

    #[test]
    fn test_codegen_wrappers_tracked_separately() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let mut wrapper = raw(9, "WholeStageCodegen (1)", None);
        wrapper.metrics = vec![Metric::new("duration", "250 ms")];
        let mut snap = chain("1", ExecutionStatus::Completed);
        snap.nodes.push(wrapper);

        let execution = aggregator.materialize(&snap, &EnrichmentContext::default(), None);
        assert_eq!(execution.nodes.len(), 3);
        assert_eq!(execution.codegen_nodes.len(), 1);
        let codegen = &execution.codegen_nodes[0];
        assert!(codegen.is_codegen_node);
        assert_eq!(codegen.codegen_group_id, Some(1));
        assert_eq!(codegen.duration, Some(250.0));
        assert!(!execution.filter_tiers.advanced.visible_node_ids.contains(&9));
    }

    #[test]
    fn test_unparseable_plan_does_not_abort_siblings() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let mut context = EnrichmentContext::default();
        context.plans.insert(
            "1".to_string(),
            vec![
                NodePlan { id: 1, plan_description: "Filter".to_string() },
                NodePlan { id: 2, plan_description: "Project [a#1, b#2]".to_string() },
            ],
        );

        let execution = aggregator.materialize(&chain("1", ExecutionStatus::Completed), &context, None);
        assert!(execution.node(1).unwrap().parsed_plan.is_none());
        assert!(matches!(execution.node(2).unwrap().parsed_plan, Some(ParsedPlan::Project(_))));
    }

    #[test]
    fn test_unknown_execution_metric_update_is_noop() {
        let options = AnalyzerOptions::default();
        let ids = SequenceIdGenerator::new("t");
        let aggregator = PlanAggregator::new(&options, &ids);
        let store = aggregator.update_store(
            ExecutionStore::default(),
            &[chain("1", ExecutionStatus::Running)],
            &EnrichmentContext::default(),
        );

        let update = ExecutionMetricsUpdate {
            execution_id: "99".to_string(),
            nodes: vec![NodeMetricsUpdate { id: 0, metrics: vec![] }],
        };
        assert_eq!(aggregator.apply_metrics(store.clone(), &update), store);
    }
}
