//! CollectLimit plan parser (`CollectLimit 21`)

use crate::services::plan_analyzer::models::ParsedCollectLimitPlan;
use crate::services::plan_analyzer::parser::core::ValueParser;
use crate::services::plan_analyzer::parser::core::expression::after_operator_token;
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_collect_limit(text: &str) -> ParseResult<ParsedCollectLimitPlan> {
    let argument = after_operator_token(text);
    let first = argument.split(|c: char| c.is_whitespace()).next().unwrap_or("");
    let limit = ValueParser::parse_count(first)
        .map_err(|_| ParseError::unrecognized("CollectLimit", text))?;
    Ok(ParsedCollectLimitPlan { limit })
}
