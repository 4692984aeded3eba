//! Join plan parser
//!
//! Equi-joins list their keys first, nested-loop and cartesian joins do not:
//! ```text
//! BroadcastHashJoin [cust_id#1], [id#7], Inner, BuildRight, false
//! SortMergeJoin [a#1, b#2], [a#5, b#6], LeftOuter, (c#3 > d#8)
//! BroadcastNestedLoopJoin BuildRight, Cross, (start#1 <= ts#9)
//! CartesianProduct (a#1 < b#2)
//! ```

use crate::services::plan_analyzer::models::ParsedJoinPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    after_operator_token, enclosed, split_top_level, strip_expr_ids, unwrap_parens,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

const JOIN_TYPES: [&str; 8] = [
    "Inner",
    "Cross",
    "LeftOuter",
    "RightOuter",
    "FullOuter",
    "LeftSemi",
    "LeftAnti",
    "ExistenceJoin",
];

fn is_join_type(part: &str) -> bool {
    JOIN_TYPES.iter().any(|t| part == *t || part.starts_with(&format!("{}(", t)))
}

fn is_build_side(part: &str) -> bool {
    part == "BuildLeft" || part == "BuildRight"
}

pub fn parse_join(text: &str) -> ParseResult<ParsedJoinPlan> {
    let clean = strip_expr_ids(text);
    let operator = clean.split(|c: char| c.is_whitespace()).next().unwrap_or("");
    let parts = split_top_level(after_operator_token(&clean), ',');

    if operator.ends_with("CartesianProduct") {
        let condition = parts.first().map(|c| unwrap_parens(c).to_string());
        return Ok(ParsedJoinPlan {
            join_type: "Cross".to_string(),
            join_side_type: None,
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            join_condition: condition,
        });
    }

    let mut remaining = parts.as_slice();
    let (left_keys, right_keys) = match remaining {
        [left, right, rest @ ..] if left.starts_with('[') && right.starts_with('[') => {
            remaining = rest;
            (keys(left, text)?, keys(right, text)?)
        }
        _ => (Vec::new(), Vec::new()),
    };

    let mut join_type = None;
    let mut join_side_type = None;
    let mut join_condition = None;
    for part in remaining {
        if join_type.is_none() && is_join_type(part) {
            join_type = Some(part.clone());
        } else if is_build_side(part) {
            join_side_type = Some(part.clone());
        } else if part == "true" || part == "false" {
            // null-aware anti join flag
        } else if join_condition.is_none() {
            join_condition = Some(unwrap_parens(part).to_string());
        }
    }

    let join_type = join_type.ok_or_else(|| ParseError::missing_field("Join", "joinType"))?;
    Ok(ParsedJoinPlan { join_type, join_side_type, left_keys, right_keys, join_condition })
}

fn keys(list: &str, text: &str) -> ParseResult<Vec<String>> {
    enclosed(list, 0)
        .map(|(inner, _)| split_top_level(inner, ','))
        .ok_or_else(|| ParseError::unrecognized("Join", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broadcast_hash_join() {
        let plan = parse_join("BroadcastHashJoin [cust_id#1], [id#7], Inner, BuildRight, false").unwrap();
        assert_eq!(plan.join_type, "Inner");
        assert_eq!(plan.join_side_type.as_deref(), Some("BuildRight"));
        assert_eq!(plan.left_keys, vec!["cust_id"]);
        assert_eq!(plan.right_keys, vec!["id"]);
        assert!(plan.join_condition.is_none());
    }

    #[test]
    fn test_parse_sort_merge_join_with_condition() {
        let plan = parse_join("SortMergeJoin [a#1, b#2], [a#5, b#6], LeftOuter, (c#3 > d#8)").unwrap();
        assert_eq!(plan.join_type, "LeftOuter");
        assert_eq!(plan.left_keys, vec!["a", "b"]);
        assert_eq!(plan.right_keys, vec!["a", "b"]);
        assert_eq!(plan.join_condition.as_deref(), Some("c > d"));
        assert!(plan.join_side_type.is_none());
    }

    #[test]
    fn test_parse_nested_loop_join() {
        let plan = parse_join("BroadcastNestedLoopJoin BuildRight, Cross, (start#1 <= ts#9)").unwrap();
        assert_eq!(plan.join_type, "Cross");
        assert_eq!(plan.join_side_type.as_deref(), Some("BuildRight"));
        assert!(plan.left_keys.is_empty());
        assert_eq!(plan.join_condition.as_deref(), Some("start <= ts"));
    }

    #[test]
    fn test_parse_cartesian_product() {
        let plan = parse_join("CartesianProduct (a#1 < b#2)").unwrap();
        assert_eq!(plan.join_type, "Cross");
        assert_eq!(plan.join_condition.as_deref(), Some("a < b"));
    }

    #[test]
    fn test_join_without_type() {
        assert!(parse_join("SortMergeJoin [a#1], [b#2]").is_err());
    }
}
