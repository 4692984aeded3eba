//! Coalesce plan parser (`Coalesce 1`)

use crate::services::plan_analyzer::models::ParsedCoalescePlan;
use crate::services::plan_analyzer::parser::core::ValueParser;
use crate::services::plan_analyzer::parser::core::expression::after_operator_token;
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_coalesce(text: &str) -> ParseResult<ParsedCoalescePlan> {
    let argument = after_operator_token(text);
    let first = argument.split(|c: char| c.is_whitespace() || c == ',').next().unwrap_or("");
    let partition_num =
        ValueParser::parse_count(first).map_err(|_| ParseError::unrecognized("Coalesce", text))?;
    Ok(ParsedCoalescePlan { partition_num })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coalesce() {
        assert_eq!(parse_coalesce("Coalesce 1").unwrap().partition_num, 1);
        assert_eq!(parse_coalesce("GpuCoalesce 64").unwrap().partition_num, 64);
        assert!(parse_coalesce("Coalesce").is_err());
    }
}
