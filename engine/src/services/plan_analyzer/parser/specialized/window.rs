//! Window plan parser
//!
//! `Window [rank(b#2) windowspecdefinition(...) AS r#3], [a#1], [b#2 ASC NULLS FIRST]`

use crate::services::plan_analyzer::models::ParsedWindowPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    after_operator_token, enclosed, split_top_level, strip_expr_ids,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

pub fn parse_window(text: &str) -> ParseResult<ParsedWindowPlan> {
    let clean = strip_expr_ids(text);
    let arguments = after_operator_token(&clean);

    let mut lists: Vec<Vec<String>> = Vec::with_capacity(3);
    for part in split_top_level(arguments, ',') {
        if !part.starts_with('[') {
            continue;
        }
        let (inner, _) = enclosed(&part, 0).ok_or_else(|| ParseError::unrecognized("Window", text))?;
        lists.push(split_top_level(inner, ','));
    }

    if lists.len() != 3 {
        return Err(ParseError::unrecognized("Window", text));
    }
    let sort_fields = lists.pop().unwrap_or_default();
    let partition_fields = lists.pop().unwrap_or_default();
    let select_fields = lists.pop().unwrap_or_default();

    Ok(ParsedWindowPlan { select_fields, partition_fields, sort_fields })
}
