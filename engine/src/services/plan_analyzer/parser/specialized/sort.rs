//! Sort plan parser (`Sort [a#1 ASC NULLS FIRST], true, 0`)

use crate::services::plan_analyzer::models::ParsedSortPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    after_operator_token, enclosed, split_top_level, strip_expr_ids,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_sort(text: &str) -> ParseResult<ParsedSortPlan> {
    let clean = strip_expr_ids(text);
    let arguments = after_operator_token(&clean);
    if !arguments.starts_with('[') {
        return Err(ParseError::unrecognized("Sort", text));
    }
    let (inner, end) =
        enclosed(arguments, 0).ok_or_else(|| ParseError::unrecognized("Sort", text))?;

    let rest = split_top_level(&arguments[end..], ',');
    let is_global = rest.first().map(|flag| flag == "true").unwrap_or(false);

    Ok(ParsedSortPlan { fields: split_top_level(inner, ','), is_global })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_sort() {
        let plan = parse_sort("Sort [total#5 DESC NULLS LAST, name#1 ASC NULLS FIRST], true, 0").unwrap();
        assert_eq!(plan.fields, vec!["total DESC NULLS LAST", "name ASC NULLS FIRST"]);
        assert!(plan.is_global);
    }

    #[test]
    fn test_parse_local_sort() {
        let plan = parse_sort("Sort [key#3 ASC NULLS FIRST], false, 0").unwrap();
        assert!(!plan.is_global);
    }
}
