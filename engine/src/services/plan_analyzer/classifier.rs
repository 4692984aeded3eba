//! Node classification
//!
//! Maps raw operator names, including the aliases emitted by accelerated engines
//! (GPU, vectorized native, columnar), to a canonical operator name, a coarse
//! category and a human-facing display name.

use crate::services::plan_analyzer::models::{NodeCategory, ParsedPlan};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Engine prefixes stripped from the first token of an operator name
const ENGINE_PREFIXES: [&str; 5] = ["Gpu", "Comet", "Photon", "Velox", "Columnar"];

/// Engine suffixes stripped from the first token, longest first
const ENGINE_SUFFIXES: [&str; 3] = ["ExecTransformer", "Transformer", "Exec"];

/// Operator names that are wrappers rather than plan steps
pub const WRAPPER_NODE_NAMES: [&str; 2] = ["AdaptiveSparkPlan", "WholeStageCodegen"];

static CODEGEN_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^WholeStageCodegen\s*\((\d+)\)").unwrap());

/// Engine-specific names that do not reduce to the canonical one by affix stripping
static CANONICAL_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ShuffleExchange", "Exchange"),
        ("ShuffleExchangeSink", "Exchange"),
        ("ShuffleExchangeSource", "Exchange"),
        ("GroupingAgg", "HashAggregate"),
        ("RegularHashAggregate", "HashAggregate"),
        ("FlushableHashAggregate", "HashAggregate"),
        ("GpuTopN", "TakeOrderedAndProject"),
        ("TopN", "TakeOrderedAndProject"),
        ("FileGpuScan", "Scan"),
        ("ShuffleHashJoin", "ShuffledHashJoin"),
        ("FileSourceScan", "Scan"),
        ("NativeScan", "Scan"),
    ])
});

static CATEGORY_BY_NAME: Lazy<HashMap<&'static str, NodeCategory>> = Lazy::new(|| {
    use NodeCategory::*;
    HashMap::from([
        ("LocalTableScan", Input),
        ("InMemoryTableScan", Input),
        ("Range", Input),
        ("Execute InsertIntoHadoopFsRelationCommand", Output),
        ("Execute InsertIntoHiveTable", Output),
        ("Execute CreateDataSourceTableAsSelectCommand", Output),
        ("Execute SaveIntoDataSourceCommand", Output),
        ("AppendData", Output),
        ("OverwriteByExpression", Output),
        ("WriteToDataSourceV2", Output),
        ("CollectLimit", Output),
        ("TakeOrderedAndProject", Output),
        ("BroadcastHashJoin", Join),
        ("SortMergeJoin", Join),
        ("ShuffledHashJoin", Join),
        ("BroadcastNestedLoopJoin", Join),
        ("CartesianProduct", Join),
        ("Union", Join),
        ("Filter", Transformation),
        ("Project", Transformation),
        ("HashAggregate", Transformation),
        ("ObjectHashAggregate", Transformation),
        ("SortAggregate", Transformation),
        ("Exchange", Transformation),
        ("BroadcastExchange", Transformation),
        ("Sort", Transformation),
        ("Window", Transformation),
        ("Expand", Transformation),
        ("Generate", Transformation),
        ("Coalesce", Transformation),
        ("GlobalLimit", Transformation),
        ("LocalLimit", Transformation),
        ("Sample", Transformation),
    ])
});

static DISPLAY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BroadcastHashJoin", "Join (Broadcast Hash)"),
        ("SortMergeJoin", "Join (Sort Merge)"),
        ("ShuffledHashJoin", "Join (Shuffled Hash)"),
        ("BroadcastNestedLoopJoin", "Join (Broadcast Nested Loop)"),
        ("CartesianProduct", "Join (Cartesian Product)"),
        ("Exchange", "Repartition"),
        ("BroadcastExchange", "Broadcast"),
        ("TakeOrderedAndProject", "Take Ordered"),
        ("CollectLimit", "Collect"),
        ("LocalTableScan", "Read In-memory Table"),
        ("InMemoryTableScan", "Read Cache"),
        ("Execute InsertIntoHadoopFsRelationCommand", "Write To HDFS"),
        ("Project", "Select"),
        ("AQEShuffleRead", "AQE Shuffle Read"),
        ("GlobalLimit", "Limit"),
        ("LocalLimit", "Limit"),
    ])
});

/// Stateless operator-name classifier
pub struct NodeClassifier;

impl NodeClassifier {
    /// Canonical operator name, e.g. `GpuFilter` -> `Filter`,
    /// `CometScan parquet db.t` -> `Scan parquet db.t`, `ColumnarExchange` -> `Exchange`
    pub fn normalize_name(name: &str) -> String {
        let name = name.trim();
        let (head, tail) = match name.find(char::is_whitespace) {
            Some(pos) => name.split_at(pos),
            None => (name, ""),
        };

        let mut head = head;
        for _ in 0..2 {
            let stripped = ENGINE_PREFIXES.iter().find_map(|prefix| {
                head.strip_prefix(prefix).filter(|rest| {
                    rest.starts_with(|c: char| c.is_ascii_uppercase()) && !rest.starts_with("To")
                })
            });
            match stripped {
                Some(rest) => head = rest,
                None => break,
            }
        }

        if let Some(rest) = ENGINE_SUFFIXES
            .iter()
            .find_map(|suffix| head.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        {
            head = rest;
        }

        let head = CANONICAL_ALIASES.get(head).copied().unwrap_or(head);
        format!("{}{}", head, tail)
    }

    /// Category of a raw operator name. Pure function of `name`.
    pub fn classify(name: &str) -> NodeCategory {
        let normalized = Self::normalize_name(name);
        Self::classify_normalized(&normalized)
    }

    pub fn classify_normalized(normalized: &str) -> NodeCategory {
        if let Some(category) = CATEGORY_BY_NAME.get(normalized) {
            return *category;
        }
        if normalized.starts_with("Execute ")
            && ["Insert", "Write", "Save", "AsSelect"].iter().any(|k| normalized.contains(k))
        {
            return NodeCategory::Output;
        }
        if normalized.contains("Join") {
            return NodeCategory::Join;
        }
        if normalized.contains("Scan") {
            return NodeCategory::Input;
        }
        NodeCategory::Other
    }

    /// Human-facing name for a normalized operator name
    pub fn display_name(normalized: &str, parsed_plan: Option<&ParsedPlan>) -> String {
        if let Some(ParsedPlan::HashAggregate(aggregate)) = parsed_plan
            && aggregate.is_distinct()
        {
            return "Distinct".to_string();
        }
        if matches!(normalized, "HashAggregate" | "ObjectHashAggregate" | "SortAggregate") {
            return "Aggregate".to_string();
        }

        let scan_source = if normalized == "Scan" { Some("") } else { normalized.strip_prefix("Scan ") };
        if let Some(source) = scan_source {
            let format = match parsed_plan {
                Some(ParsedPlan::FileScan(scan)) => scan.format.clone(),
                _ => source.split_whitespace().next().unwrap_or_default().to_string(),
            };
            if format.is_empty() {
                return "Read".to_string();
            }
            return format!("Read {}", capitalize(&format));
        }

        DISPLAY_NAMES
            .get(normalized)
            .map(|name| name.to_string())
            .unwrap_or_else(|| normalized.to_string())
    }

    pub fn is_codegen_wrapper(normalized: &str) -> bool {
        normalized.starts_with("WholeStageCodegen")
    }

    /// Group id of a `WholeStageCodegen (N)` wrapper
    pub fn codegen_group_id(normalized: &str) -> Option<i64> {
        CODEGEN_ID_REGEX
            .captures(normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Wrapper operators never chosen as the forced output node
    pub fn is_wrapper(normalized: &str) -> bool {
        WRAPPER_NODE_NAMES.iter().any(|w| normalized.starts_with(w))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
