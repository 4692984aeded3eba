//! HashAggregate plan parser
//!
//! `HashAggregate(keys=[a#1, b#2], functions=[partial_sum(c#3), count(1)])`

use crate::services::plan_analyzer::models::ParsedHashAggregatePlan;
use crate::services::plan_analyzer::parser::core::expression::{list_after, strip_expr_ids};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_hash_aggregate(text: &str) -> ParseResult<ParsedHashAggregatePlan> {
    let clean = strip_expr_ids(text);
    let keys = list_after(&clean, "keys=");
    let functions = list_after(&clean, "functions=");

    if keys.is_none() && functions.is_none() {
        return Err(ParseError::unrecognized("HashAggregate", text));
    }

    let functions = functions.unwrap_or_default();
    let mut operations: Vec<String> = Vec::new();
    for function in &functions {
        let name = function.split('(').next().unwrap_or("").trim();
        if !name.is_empty() && !operations.iter().any(|op| op == name) {
            operations.push(name.to_string());
        }
    }

    Ok(ParsedHashAggregatePlan { keys: keys.unwrap_or_default(), functions, operations })
}
