//! Plan graph construction and contraction

pub mod builder;
pub mod contractor;

pub use builder::PlanGraph;
pub use contractor::{build_tiers, contract};
