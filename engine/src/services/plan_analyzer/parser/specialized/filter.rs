//! Filter plan parser (`Filter (isnotnull(a#1) AND (a#1 > 5))`)

use crate::services::plan_analyzer::models::ParsedFilterPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    after_operator_token, strip_expr_ids, unwrap_parens,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_filter(text: &str) -> ParseResult<ParsedFilterPlan> {
    let clean = strip_expr_ids(text);
    let condition = unwrap_parens(after_operator_token(&clean));
    if condition.is_empty() {
        return Err(ParseError::missing_field("Filter", "condition"));
    }
    Ok(ParsedFilterPlan { condition: condition.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_condition() {
        let plan = parse_filter("Filter (isnotnull(age#3) AND (age#3 > 21))").unwrap();
        assert_eq!(plan.condition, "isnotnull(age) AND (age > 21)");
    }

    #[test]
    fn test_parse_accelerated_filter() {
        let plan = parse_filter("GpuFilter (status#7 = shipped)").unwrap();
        assert_eq!(plan.condition, "status = shipped");
    }

    #[test]
    fn test_empty_filter() {
        assert!(parse_filter("Filter").is_err());
    }
}
