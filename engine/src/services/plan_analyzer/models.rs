//! Plan analysis data models
//!
//! Raw snapshots as delivered by the collectors, the typed plan structures extracted
//! from plan descriptions, and the enriched execution store handed to renderers.
//! Everything serializes in camelCase to match the collectors' JSON.

use crate::services::plan_analyzer::parser::core::value_parser::ValueParser;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type NodeId = i64;

// ============================================================================
// Raw Input (from collectors)
// ============================================================================

/// A single runtime metric as reported by the engine, value still unparsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: String,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Directed edge between two plan nodes of the same execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEdge {
    pub from_id: NodeId,
    pub to_id: NodeId,
}

impl PlanEdge {
    pub fn new(from_id: NodeId, to_id: NodeId) -> Self {
        Self { from_id, to_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// A node of the raw plan graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub node_id: NodeId,
    pub node_name: String,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whole_stage_codegen_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
}

/// One polling snapshot of a query execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlSnapshot {
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_time: Option<String>,
    /// Wall-clock duration in milliseconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub running_job_ids: Vec<i64>,
    #[serde(default)]
    pub success_job_ids: Vec<i64>,
    #[serde(default)]
    pub failed_job_ids: Vec<i64>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<PlanEdge>,
}

/// Plan description text of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePlan {
    pub id: NodeId,
    pub plan_description: String,
}

/// Plan descriptions keyed by execution id
pub type SqlPlans = HashMap<String, Vec<NodePlan>>;

/// Table-format commit written by an execution (e.g. an Iceberg snapshot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub table_name: String,
    pub commit_id: i64,
    pub operation: String,
    #[serde(default)]
    pub metrics: HashMap<String, String>,
}

/// Cached RDD storage attached to a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedStorage {
    pub rdd_id: i64,
    pub storage_level: String,
    #[serde(default, deserialize_with = "size_in_bytes")]
    pub memory_used: u64,
    #[serde(default, deserialize_with = "size_in_bytes")]
    pub disk_used: u64,
    #[serde(default)]
    pub num_partitions: u64,
}

/// Sizes arrive either as a byte count or as engine text such as `12.3 MiB`
fn size_in_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Bytes(bytes) => Ok(bytes),
        Size::Text(text) => ValueParser::parse_bytes(&text).map_err(serde::de::Error::custom),
    }
}

/// Fresh metric values for one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricsUpdate {
    pub id: NodeId,
    pub metrics: Vec<Metric>,
}

/// Incremental metric push for one execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetricsUpdate {
    pub execution_id: String,
    pub nodes: Vec<NodeMetricsUpdate>,
}

/// Side inputs consulted while materializing an execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentContext {
    #[serde(default)]
    pub plans: SqlPlans,
    #[serde(default)]
    pub commits: HashMap<String, CommitInfo>,
    /// Cached storage entries keyed by stage id
    #[serde(default)]
    pub storage: HashMap<i64, Vec<CachedStorage>>,
}

/// Complete input document accepted by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInput {
    #[serde(default)]
    pub executions: Vec<SqlSnapshot>,
    #[serde(default)]
    pub plans: SqlPlans,
    #[serde(default)]
    pub commits: HashMap<String, CommitInfo>,
    #[serde(default)]
    pub storage: HashMap<i64, Vec<CachedStorage>>,
    #[serde(default)]
    pub metric_updates: Vec<ExecutionMetricsUpdate>,
}

impl EngineInput {
    /// Snapshots, side inputs and metric pushes
    pub fn into_parts(self) -> (Vec<SqlSnapshot>, EnrichmentContext, Vec<ExecutionMetricsUpdate>) {
        let context = EnrichmentContext {
            plans: self.plans,
            commits: self.commits,
            storage: self.storage,
        };
        (self.executions, context, self.metric_updates)
    }
}

// ============================================================================
// Parsed Plans (one variant per operator kind)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "plan")]
pub enum ParsedPlan {
    HashAggregate(ParsedHashAggregatePlan),
    TakeOrderedAndProject(ParsedTakeOrderedAndProjectPlan),
    CollectLimit(ParsedCollectLimitPlan),
    Coalesce(ParsedCoalescePlan),
    WriteToHDFS(ParsedWriteToHdfsPlan),
    Filter(ParsedFilterPlan),
    Exchange(ParsedExchangePlan),
    Project(ParsedProjectPlan),
    Sort(ParsedSortPlan),
    Window(ParsedWindowPlan),
    FileScan(ParsedFileScanPlan),
    Join(ParsedJoinPlan),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedHashAggregatePlan {
    pub keys: Vec<String>,
    pub functions: Vec<String>,
    /// Aggregate function names in order of first appearance (`partial_sum`, `count`)
    pub operations: Vec<String>,
}

impl ParsedHashAggregatePlan {
    /// Grouping without aggregate functions is a distinct
    pub fn is_distinct(&self) -> bool {
        self.functions.is_empty() && !self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTakeOrderedAndProjectPlan {
    pub limit: u64,
    pub order_by: Vec<String>,
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCollectLimitPlan {
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCoalescePlan {
    pub partition_num: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedWriteToHdfsPlan {
    pub location: String,
    pub format: Option<String>,
    pub mode: String,
    pub partition_keys: Vec<String>,
    pub table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFilterPlan {
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedExchangePlan {
    pub partition_type: String,
    pub fields: Vec<String>,
    pub partition_count: Option<u64>,
    pub is_broadcast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProjectPlan {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSortPlan {
    pub fields: Vec<String>,
    pub is_global: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedWindowPlan {
    pub select_fields: Vec<String>,
    pub partition_fields: Vec<String>,
    pub sort_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFileScanPlan {
    pub format: String,
    pub table_name: Option<String>,
    pub location: Option<String>,
    pub partition_filters: Vec<String>,
    pub pushed_filters: Vec<String>,
    pub data_filters: Vec<String>,
    pub read_schema: Option<String>,
    pub selected_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedJoinPlan {
    pub join_type: String,
    pub join_side_type: Option<String>,
    pub left_keys: Vec<String>,
    pub right_keys: Vec<String>,
    pub join_condition: Option<String>,
}

// ============================================================================
// Enriched Output
// ============================================================================

/// Coarse node category used for tier filtering and styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Input,
    Output,
    Join,
    Transformation,
    Other,
}

/// Shuffle read/write split of an exchange, milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDurations {
    pub write_duration: f64,
    pub read_duration: f64,
    pub duration: f64,
}

/// An enriched plan node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub node_id: NodeId,
    pub node_name: String,
    /// Operator name with engine-specific prefixes and suffixes removed
    pub normalized_name: String,
    pub display_name: String,
    pub category: NodeCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_plan: Option<ParsedPlan>,
    /// Raw metrics followed by derived ones
    pub metrics: Vec<Metric>,
    pub is_codegen_node: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codegen_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_durations: Option<ExchangeDurations>,
    /// Broadcast time for broadcast exchanges, total time for codegen wrappers (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_storage: Option<CachedStorage>,
}

/// Detail level of a contracted view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Io,
    Basic,
    Advanced,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Io, Tier::Basic, Tier::Advanced];

    pub fn includes(self, category: NodeCategory) -> bool {
        match self {
            Tier::Io => matches!(category, NodeCategory::Input | NodeCategory::Output),
            Tier::Basic => !matches!(category, NodeCategory::Other),
            Tier::Advanced => true,
        }
    }
}

/// One contracted view of the plan graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTier {
    pub visible_node_ids: BTreeSet<NodeId>,
    pub edges: Vec<PlanEdge>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterTiers {
    pub io: FilterTier,
    pub basic: FilterTier,
    pub advanced: FilterTier,
}

impl FilterTiers {
    pub fn get(&self, tier: Tier) -> &FilterTier {
        match tier {
            Tier::Io => &self.io,
            Tier::Basic => &self.basic,
            Tier::Advanced => &self.advanced,
        }
    }
}

/// A fully enriched query execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_time: Option<String>,
    pub duration: f64,
    pub running_job_ids: Vec<i64>,
    pub success_job_ids: Vec<i64>,
    pub failed_job_ids: Vec<i64>,
    /// Node count of the snapshot this structure was built from, codegen wrappers included
    pub original_node_count: usize,
    pub is_single_node: bool,
    /// Graph nodes (codegen wrappers excluded)
    pub nodes: Vec<PlanNode>,
    pub edges: Vec<PlanEdge>,
    pub filter_tiers: FilterTiers,
    pub codegen_nodes: Vec<PlanNode>,
    pub stable_unique_id: String,
    pub metric_revision_id: String,
}

impl Execution {
    pub fn node(&self, node_id: NodeId) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }
}

/// Executions ordered by id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionStore {
    pub executions: Vec<Execution>,
}

impl ExecutionStore {
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

/// Sort key for execution ids: numeric ids in numeric order, anything else after them
pub fn execution_order_key(id: &str) -> (i64, &str) {
    (id.parse::<i64>().unwrap_or(i64::MAX), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_storage_sizes_accept_engine_text() {
        let entries: Vec<CachedStorage> = serde_json::from_str(
            r#"[
                {"rddId": 3, "storageLevel": "MEMORY_ONLY", "memoryUsed": "1,024 B", "diskUsed": 0, "numPartitions": 4},
                {"rddId": 4, "storageLevel": "DISK_ONLY", "memoryUsed": 2048, "diskUsed": "2 KiB"},
                {"rddId": 5, "storageLevel": "NONE"}
            ]"#,
        )
        .unwrap();

        assert_eq!(entries[0].memory_used, 1024);
        assert_eq!(entries[1].memory_used, 2048);
        assert_eq!(entries[1].disk_used, 2048);
        assert_eq!(entries[2].memory_used, 0);
    }

    #[test]
    fn test_cached_storage_rejects_unknown_size_unit() {
        let result = serde_json::from_str::<CachedStorage>(
            r#"{"rddId": 3, "storageLevel": "MEMORY_ONLY", "memoryUsed": "3 parsecs"}"#,
        );
        assert!(result.is_err());
    }
}
