//! Plan description parser module
//!
//! Provides parsing capabilities for the engine's per-node plan descriptions.

pub mod core;
pub mod error;
pub mod specialized;

use crate::services::plan_analyzer::models::ParsedPlan;
use error::ParseResult;
use specialized::*;

/// Operator kinds with a dedicated plan parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    HashAggregate,
    TakeOrderedAndProject,
    CollectLimit,
    Coalesce,
    WriteToHDFS,
    Filter,
    Exchange,
    Project,
    Sort,
    Window,
    FileScan,
    Join,
}

impl OperatorKind {
    /// Resolve the parser for a normalized operator name
    pub fn from_name(normalized_name: &str) -> Option<Self> {
        let kind = match normalized_name {
            "HashAggregate" | "ObjectHashAggregate" | "SortAggregate" => Self::HashAggregate,
            "TakeOrderedAndProject" => Self::TakeOrderedAndProject,
            "CollectLimit" => Self::CollectLimit,
            "Coalesce" => Self::Coalesce,
            "Execute InsertIntoHadoopFsRelationCommand" => Self::WriteToHDFS,
            "Filter" => Self::Filter,
            "Exchange" | "BroadcastExchange" => Self::Exchange,
            "Project" => Self::Project,
            "Sort" => Self::Sort,
            "Window" => Self::Window,
            "BroadcastHashJoin" | "SortMergeJoin" | "ShuffledHashJoin"
            | "BroadcastNestedLoopJoin" | "CartesianProduct" => Self::Join,
            "Scan" => Self::FileScan,
            name if name.starts_with("Scan ") => Self::FileScan,
            _ => return None,
        };
        Some(kind)
    }

    pub fn parse(self, text: &str) -> ParseResult<ParsedPlan> {
        let plan = match self {
            Self::HashAggregate => ParsedPlan::HashAggregate(parse_hash_aggregate(text)?),
            Self::TakeOrderedAndProject => {
                ParsedPlan::TakeOrderedAndProject(parse_take_ordered_and_project(text)?)
            }
            Self::CollectLimit => ParsedPlan::CollectLimit(parse_collect_limit(text)?),
            Self::Coalesce => ParsedPlan::Coalesce(parse_coalesce(text)?),
            Self::WriteToHDFS => ParsedPlan::WriteToHDFS(parse_write_to_hdfs(text)?),
            Self::Filter => ParsedPlan::Filter(parse_filter(text)?),
            Self::Exchange => ParsedPlan::Exchange(parse_exchange(text)?),
            Self::Project => ParsedPlan::Project(parse_project(text)?),
            Self::Sort => ParsedPlan::Sort(parse_sort(text)?),
            Self::Window => ParsedPlan::Window(parse_window(text)?),
            Self::FileScan => ParsedPlan::FileScan(parse_file_scan(text)?),
            Self::Join => ParsedPlan::Join(parse_join(text)?),
        };
        Ok(plan)
    }
}

/// Parser facade used by the aggregator
pub struct OperatorParser;

impl OperatorParser {
    /// Parse a node's plan description.
    ///
    /// Returns `Ok(None)` when the operator kind has no parser; that is not an error.
    pub fn parse(normalized_name: &str, plan_description: &str) -> ParseResult<Option<ParsedPlan>> {
        match OperatorKind::from_name(normalized_name) {
            Some(kind) => kind.parse(plan_description).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatch() {
        let plan = OperatorParser::parse("Filter", "Filter (a#1 > 1)").unwrap();
        assert!(matches!(plan, Some(ParsedPlan::Filter(_))));

        let plan = OperatorParser::parse("Scan parquet db.t", "FileScan parquet db.t[a#1] Batched: true, Format: Parquet").unwrap();
        assert!(matches!(plan, Some(ParsedPlan::FileScan(_))));
    }

    #[test]
    fn test_bare_native_scan_dispatches_to_file_scan() {
        let plan = OperatorParser::parse("Scan", "FileSourceScanExecTransformer orc db.t[a#1] Format: ORC").unwrap();
        assert!(matches!(plan, Some(ParsedPlan::FileScan(_))));
    }

    #[test]
    fn test_unregistered_operator_is_not_an_error() {
        assert_eq!(OperatorParser::parse("Expand", "Expand [...]").unwrap(), None);
    }

    #[test]
    fn test_registered_operator_with_bad_text() {
        assert!(OperatorParser::parse("Join", "nonsense").is_ok());
        assert!(OperatorParser::parse("SortMergeJoin", "SortMergeJoin nonsense").is_err());
    }
}
