//! FileScan plan parser
//!
//! ```text
//! FileScan parquet spark_catalog.db.orders[id#1,amount#2,day#3] Batched: true,
//!   DataFilters: [isnotnull(amount#2)], Format: Parquet,
//!   Location: InMemoryFileIndex(1 paths)[file:/warehouse/orders],
//!   PartitionFilters: [], PushedFilters: [IsNotNull(amount)], ReadSchema: struct<id:int,amount:int>
//! ```

use crate::services::plan_analyzer::models::ParsedFileScanPlan;
use crate::services::plan_analyzer::parser::core::expression::{
    enclosed, split_top_level, strip_expr_ids,
};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static SCAN_HEAD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\w*Scan\w*\s+(\w+)\s*([^\[\s]*)").unwrap());

static SCAN_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(Batched|DataFilters|Format|Location|PartitionFilters|PushedFilters|ReadSchema|PartitionCount|SelectedBucketsCount):\s*",
    )
    .unwrap()
});

pub fn parse_file_scan(text: &str) -> ParseResult<ParsedFileScanPlan> {
    let clean = strip_expr_ids(text);
    let caps = SCAN_HEAD_REGEX
        .captures(&clean)
        .ok_or_else(|| ParseError::unrecognized("FileScan", text))?;
    let head_format = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let table = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let head_end = caps.get(0).map(|m| m.end()).unwrap_or(0);

    let (selected_columns, body_start) = if clean[head_end..].starts_with('[') {
        let (inner, end) = enclosed(&clean, head_end)
            .ok_or_else(|| ParseError::unrecognized("FileScan", text))?;
        (split_top_level(inner, ','), end)
    } else {
        (Vec::new(), head_end)
    };

    let fields = key_values(&clean[body_start..]);
    let format = fields
        .get("Format")
        .map(|f| f.to_string())
        .unwrap_or_else(|| head_format.to_string());
    if format.is_empty() {
        return Err(ParseError::missing_field("FileScan", "Format"));
    }

    Ok(ParsedFileScanPlan {
        format,
        table_name: Some(table.to_string()).filter(|t| !t.is_empty()),
        location: fields.get("Location").map(|l| location_paths(l)),
        partition_filters: fields.get("PartitionFilters").map(|v| list(v)).unwrap_or_default(),
        pushed_filters: fields.get("PushedFilters").map(|v| list(v)).unwrap_or_default(),
        data_filters: fields.get("DataFilters").map(|v| list(v)).unwrap_or_default(),
        read_schema: fields.get("ReadSchema").map(|s| s.to_string()),
        selected_columns,
    })
}

/// Split `Key: value, Key: value` pairs; values may contain commas and brackets
fn key_values(body: &str) -> HashMap<&str, &str> {
    let matches: Vec<_> = SCAN_KEY_REGEX.captures_iter(body).collect();
    let mut fields = HashMap::new();

    for (i, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let value = body[whole.end()..value_end].trim().trim_end_matches(',').trim();
        fields.insert(key.as_str(), value);
    }
    fields
}

fn list(value: &str) -> Vec<String> {
    match enclosed(value, 0) {
        Some((inner, _)) if value.starts_with('[') => split_top_level(inner, ','),
        _ => Vec::new(),
    }
}

/// `InMemoryFileIndex(1 paths)[file:/warehouse/orders]` -> `file:/warehouse/orders`
fn location_paths(value: &str) -> String {
    value
        .find('[')
        .and_then(|pos| enclosed(value, pos))
        .map(|(inner, _)| inner.trim().to_string())
        .unwrap_or_else(|| value.to_string())
}
