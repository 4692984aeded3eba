//! TakeOrderedAndProject plan parser
//!
//! `TakeOrderedAndProject(limit=10, orderBy=[total#5 DESC NULLS LAST], output=[name#1,total#5])`

use crate::services::plan_analyzer::models::ParsedTakeOrderedAndProjectPlan;
use crate::services::plan_analyzer::parser::core::ValueParser;
use crate::services::plan_analyzer::parser::core::expression::{list_after, strip_expr_ids};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use regex::Regex;

static LIMIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"limit=([0-9][0-9,]*)").unwrap());

pub fn parse_take_ordered_and_project(text: &str) -> ParseResult<ParsedTakeOrderedAndProjectPlan> {
    let clean = strip_expr_ids(text);
    let limit = LIMIT_REGEX
        .captures(&clean)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| ParseError::missing_field("TakeOrderedAndProject", "limit"))?;
    let limit = ValueParser::parse_count(limit.as_str())?;

    Ok(ParsedTakeOrderedAndProjectPlan {
        limit,
        order_by: list_after(&clean, "orderBy=").unwrap_or_default(),
        output: list_after(&clean, "output=").unwrap_or_default(),
    })
}
