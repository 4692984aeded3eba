//! Project plan parser (`Project [a#1, (b#2 + 1) AS c#3]`)

use crate::services::plan_analyzer::models::ParsedProjectPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    after_operator_token, enclosed, split_top_level, strip_expr_ids,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_project(text: &str) -> ParseResult<ParsedProjectPlan> {
    let clean = strip_expr_ids(text);
    let arguments = after_operator_token(&clean);
    if !arguments.starts_with('[') {
        return Err(ParseError::unrecognized("Project", text));
    }
    let (inner, _) =
        enclosed(arguments, 0).ok_or_else(|| ParseError::unrecognized("Project", text))?;
    Ok(ParsedProjectPlan { fields: split_top_level(inner, ',') })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_fields() {
        let plan = parse_project("Project [id#1, concat(first#2, ' ', last#3) AS name#9, (price#4 * 1.1) AS gross#10]").unwrap();
        assert_eq!(
            plan.fields,
            vec!["id", "concat(first, ' ', last) AS name", "(price * 1.1) AS gross"]
        );
    }

    #[test]
    fn test_unbalanced_project() {
        assert!(parse_project("Project [a#1, b#2").is_err());
        assert!(parse_project("Project").is_err());
    }
}
