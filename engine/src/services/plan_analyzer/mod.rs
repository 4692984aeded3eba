//! Query Plan Analyzer
//!
//! Turns raw query plan snapshots (operator graph, runtime metrics and free-text
//! plan descriptions) into enriched executions with typed plans, derived metrics
//! and contracted views at three detail tiers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PlanAggregator                         │
//! │        update_store()                 apply_metrics()        │
//! │              │                               │               │
//! │   ┌──────────┼──────────────┬────────────────┤               │
//! │   ▼          ▼              ▼                ▼               │
//! │ ┌────────┐ ┌──────────┐ ┌───────────┐ ┌────────────────┐     │
//! │ │Classi- │ │ Operator │ │   Graph   │ │    Analyzer    │     │
//! │ │ fier   │ │ Parsers  │ │ ┌───────┐ │ │ ┌────────────┐ │     │
//! │ │        │ │ (12      │ │ │Builder│ │ │ │  Metric    │ │     │
//! │ │ alias  │ │  kinds)  │ │ └───────┘ │ │ │  Enricher  │ │     │
//! │ │ norm.  │ │          │ │ ┌───────┐ │ │ └────────────┘ │     │
//! │ │        │ │ Value    │ │ │Contra-│ │ │                │     │
//! │ │        │ │ Parser   │ │ │ ctor  │ │ │                │     │
//! │ └────────┘ └──────────┘ │ └───────┘ │ └────────────────┘     │
//! │                         └───────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use plan_lens::services::plan_analyzer::{AnalyzerOptions, analyze_input};
//! use plan_lens::services::plan_analyzer::identity::UuidGenerator;
//!
//! let input: EngineInput = serde_json::from_str(&json)?;
//! let store = analyze_input(input, &AnalyzerOptions::default(), &UuidGenerator);
//! for execution in &store.executions {
//!     println!("{}: {} io edges", execution.id, execution.filter_tiers.io.edges.len());
//! }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod classifier;
pub mod graph;
pub mod identity;
pub mod models;
pub mod parser;


pub use aggregator::PlanAggregator;
pub use classifier::NodeClassifier;
pub use models::*;
pub use parser::OperatorParser;

use identity::IdentityGenerator;

pub const DEFAULT_HIDDEN_NODE_NAMES: [&str; 5] =
    ["AdaptiveSparkPlan", "InputAdapter", "ColumnarToRow", "RowToColumnar", "WholeStageCodegen"];

pub const DEFAULT_ROW_COUNT_METRIC_NAMES: [&str; 3] =
    ["number of output rows", "num output rows", "output rows"];

/// Tunables of the analysis pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    /// Plumbing operators never shown in any tier
    pub hidden_node_names: Vec<String>,
    /// Metric names carrying a node's output row count, first match wins
    pub row_count_metric_names: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            hidden_node_names: DEFAULT_HIDDEN_NODE_NAMES.iter().map(|s| s.to_string()).collect(),
            row_count_metric_names: DEFAULT_ROW_COUNT_METRIC_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalyzerOptions {
    /// `WholeStageCodegen` also hides `WholeStageCodegen (3)`
    pub fn is_hidden(&self, normalized_name: &str) -> bool {
        self.hidden_node_names.iter().any(|hidden| {
            normalized_name == hidden
                || normalized_name
                    .strip_prefix(hidden.as_str())
                    .is_some_and(|rest| rest.starts_with(' '))
        })
    }

    pub fn is_row_count_metric(&self, metric_name: &str) -> bool {
        self.row_count_metric_names.iter().any(|name| name == metric_name)
    }
}

/// Analyze a complete input document
///
/// Materializes every snapshot into an empty store, then applies the metric pushes
/// in order.
pub fn analyze_input(
    input: EngineInput,
    options: &AnalyzerOptions,
    ids: &dyn IdentityGenerator,
) -> ExecutionStore {
    let (snapshots, context, metric_updates) = input.into_parts();
    let aggregator = PlanAggregator::new(options, ids);
    let store = aggregator.update_store(ExecutionStore::default(), &snapshots, &context);
    metric_updates
        .iter()
        .fold(store, |store, update| aggregator.apply_metrics(store, update))
}
