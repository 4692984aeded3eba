//! Expression helpers shared by the operator parsers
//!
//! Plan descriptions nest brackets freely (`sum(CASE WHEN (a#1 > 0) ...)`),
//! so list splitting has to respect bracket depth instead of splitting on every comma.

use once_cell::sync::Lazy;
use regex::Regex;

static EXPR_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[0-9]+L?").unwrap());

/// Remove expression ids (`a#12`, `sum(b#3L)`) from plan text
pub fn strip_expr_ids(text: &str) -> String {
    EXPR_ID_REGEX.replace_all(text, "").into_owned()
}

fn closing_for(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Split on `separator` at bracket depth zero, trimming each part and dropping empty ones
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();

    for ch in text.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if ch == separator && depth == 0 {
            let part = current.trim();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// Return the content between the bracket at byte offset `open_at` and its matching close,
/// together with the byte offset just past the closing bracket.
pub fn enclosed(text: &str, open_at: usize) -> Option<(&str, usize)> {
    let open = text[open_at..].chars().next()?;
    let close = closing_for(open)?;
    let mut depth = 0;

    for (i, ch) in text[open_at..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                let end = open_at + i;
                return Some((&text[open_at + open.len_utf8()..end], end + close.len_utf8()));
            }
        }
    }
    None
}

/// Content of the bracket that directly follows `key` (e.g. `keys=[` or `PushedFilters: [`)
pub fn bracket_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let start = text.find(key)? + key.len();
    let offset = text[start..].find(|c: char| !c.is_whitespace())?;
    enclosed(text, start + offset).map(|(inner, _)| inner)
}

/// Like [`bracket_after`] but split into list items
pub fn list_after(text: &str, key: &str) -> Option<Vec<String>> {
    bracket_after(text, key).map(|inner| split_top_level(inner, ','))
}

/// Drop one pair of parentheses wrapping the whole expression
pub fn unwrap_parens(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('(')
        && let Some((inner, end)) = enclosed(trimmed, 0)
        && end == trimmed.len()
    {
        return inner.trim();
    }
    trimmed
}

/// Text after the leading operator token, e.g. `Filter (a > 1)` -> `(a > 1)`.
///
/// The token ends at the first whitespace or opening bracket so that
/// `HashAggregate(keys=...)` and `GpuFilter (...)` both work.
pub fn after_operator_token(text: &str) -> &str {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| c.is_whitespace() || c == '(' || c == '[')
        .unwrap_or(trimmed.len());
    trimmed[end..].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_expr_ids() {
        assert_eq!(strip_expr_ids("sum(b#3L) AS total#10"), "sum(b) AS total");
        assert_eq!(strip_expr_ids("no ids here"), "no ids here");
    }

    #[test]
    fn test_split_respects_nesting() {
        let parts = split_top_level("a, sum(CASE WHEN (b > 0) THEN c ELSE d END), [x, y]", ',');
        assert_eq!(parts, vec!["a", "sum(CASE WHEN (b > 0) THEN c ELSE d END)", "[x, y]"]);
        assert!(split_top_level("  ", ',').is_empty());
    }

    #[test]
    fn test_bracket_after_nested() {
        let text = "HashAggregate(keys=[a], functions=[sum(if (b > 1) c else 0)])";
        assert_eq!(bracket_after(text, "functions="), Some("sum(if (b > 1) c else 0)"));
        assert_eq!(bracket_after(text, "missing="), None);
    }

    #[test]
    fn test_unwrap_parens_only_when_whole() {
        assert_eq!(unwrap_parens("(a > 1)"), "a > 1");
        assert_eq!(unwrap_parens("(a > 1) AND (b < 2)"), "(a > 1) AND (b < 2)");
    }

    #[test]
    fn test_after_operator_token() {
        assert_eq!(after_operator_token("Filter (a > 1)"), "(a > 1)");
        assert_eq!(after_operator_token("HashAggregate(keys=[a])"), "(keys=[a])");
        assert_eq!(after_operator_token("CollectLimit 21"), "21");
    }
}
