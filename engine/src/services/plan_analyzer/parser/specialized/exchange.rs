//! Exchange plan parser
//!
//! ```text
//! Exchange hashpartitioning(a#1, b#2, 200), ENSURE_REQUIREMENTS, [plan_id=10]
//! Exchange SinglePartition, ENSURE_REQUIREMENTS, [plan_id=5]
//! Exchange RoundRobinPartitioning(10), REPARTITION_BY_NUM, [plan_id=7]
//! BroadcastExchange HashedRelationBroadcastMode(List(input[0, int, false]),false), [plan_id=9]
//! ```

use crate::services::plan_analyzer::models::ParsedExchangePlan;
use crate::services::plan_analyzer::parser::core::ValueParser;
use crate::services::plan_analyzer::parser::core::expression::{
    enclosed, split_top_level, strip_expr_ids,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use regex::Regex;

static EXCHANGE_HEAD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w*Exchange\w*)\s+([A-Za-z]\w*)").unwrap());

pub fn parse_exchange(text: &str) -> ParseResult<ParsedExchangePlan> {
    let clean = strip_expr_ids(text);
    let caps = EXCHANGE_HEAD_REGEX
        .captures(&clean)
        .ok_or_else(|| ParseError::unrecognized("Exchange", text))?;
    let operator = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let partitioning = caps.get(2).ok_or_else(|| ParseError::unrecognized("Exchange", text))?;
    let partition_type = partitioning.as_str().to_string();
    let is_broadcast = operator.contains("Broadcast");

    let arguments = if clean[partitioning.end()..].starts_with('(') {
        enclosed(&clean, partitioning.end())
            .map(|(inner, _)| split_top_level(inner, ','))
            .ok_or_else(|| ParseError::unrecognized("Exchange", text))?
    } else {
        Vec::new()
    };

    if is_broadcast {
        return Ok(ParsedExchangePlan {
            partition_type,
            fields: Vec::new(),
            partition_count: None,
            is_broadcast,
        });
    }

    let (fields, partition_count) = match partition_type.to_lowercase().as_str() {
        "singlepartition" => (Vec::new(), Some(1)),
        "hashpartitioning" | "rangepartitioning" => {
            let mut fields = arguments;
            let count = fields.last().and_then(|last| ValueParser::parse_count(last).ok());
            if count.is_some() {
                fields.pop();
            }
            (fields, count)
        }
        "roundrobinpartitioning" => {
            let count = arguments.first().and_then(|n| ValueParser::parse_count(n).ok());
            (Vec::new(), count)
        }
        _ => return Err(ParseError::unrecognized("Exchange", text)),
    };

    Ok(ParsedExchangePlan { partition_type, fields, partition_count, is_broadcast })
}
