pub mod plan_analyzer;

pub use plan_analyzer::{PlanAggregator, analyze_input};
