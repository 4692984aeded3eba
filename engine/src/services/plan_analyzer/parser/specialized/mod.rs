//! Per-operator plan parsers
//!
//! Each parser is a pure function from plan description text to the
//! operator's structured fields.

pub mod aggregate;
pub mod coalesce;
pub mod collect_limit;
pub mod exchange;
pub mod file_scan;
pub mod filter;
pub mod join;
pub mod project;
pub mod sort;
pub mod take_ordered;
pub mod window;
pub mod write;

pub use aggregate::parse_hash_aggregate;
pub use coalesce::parse_coalesce;
pub use collect_limit::parse_collect_limit;
pub use exchange::parse_exchange;
pub use file_scan::parse_file_scan;
pub use filter::parse_filter;
pub use join::parse_join;
pub use project::parse_project;
pub use sort::parse_sort;
pub use take_ordered::parse_take_ordered_and_project;
pub use window::parse_window;
pub use write::parse_write_to_hdfs;
