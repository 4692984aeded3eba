//! Value parser for plan text and runtime metric values
//!
//! Normalizes counts, sizes and durations as the query engine prints them
//! (thousands separators, embedded units, aggregated `total (min, med, max)` blocks)
//! into plain numbers.

use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?[0-9][0-9,]*(?:\.[0-9]+)?)\s*([A-Za-zµ%]*)\s*$").unwrap());

static DURATION_PART_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*(ns|us|µs|ms|min|sec|s|m|h)").unwrap());

const KIB: f64 = 1024.0;

/// Stateless helpers for numeric normalization
pub struct ValueParser;

impl ValueParser {
    /// Reduce a metric value to the single value that carries its total.
    ///
    /// Aggregated metrics look like:
    /// ```text
    /// total (min, med, max (stageId: taskId))
    /// 1.2 s (0 ms, 10 ms, 1.1 s (stage 3.0: task 12))
    /// ```
    pub fn primary_value(raw: &str) -> &str {
        let line = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("total ("))
            .unwrap_or("");
        match line.find(" (") {
            Some(pos) => line[..pos].trim(),
            None => line,
        }
    }

    /// Parse a plain number, tolerating separators and a trailing word (`1,234,567 rows`)
    pub fn parse_number(raw: &str) -> ParseResult<f64> {
        let value = Self::primary_value(raw);
        let caps = LEADING_NUMBER_REGEX
            .captures(value)
            .ok_or_else(|| ParseError::InvalidNumber(raw.to_string()))?;
        let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("").replace(',', "");
        let number: f64 =
            digits.parse().map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
        if number.is_finite() {
            Ok(number)
        } else {
            Err(ParseError::InvalidNumber(raw.to_string()))
        }
    }

    /// Parse a non-negative integral count
    pub fn parse_count(raw: &str) -> ParseResult<u64> {
        let number = Self::parse_number(raw)?;
        if number < 0.0 {
            return Err(ParseError::InvalidNumber(raw.to_string()));
        }
        Ok(number.round() as u64)
    }

    /// Parse a size such as `12.3 MiB`, `558.156 GB` or `1,024 B` into bytes (1024-based)
    pub fn parse_bytes(raw: &str) -> ParseResult<u64> {
        let value = Self::primary_value(raw);
        let caps = LEADING_NUMBER_REGEX
            .captures(value)
            .ok_or_else(|| ParseError::InvalidNumber(raw.to_string()))?;
        let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("").replace(',', "");
        let number: f64 =
            digits.parse().map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
        let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        let multiplier = match unit.to_uppercase().as_str() {
            "" | "B" | "BYTES" => 1.0,
            "K" | "KB" | "KIB" => KIB,
            "M" | "MB" | "MIB" => KIB * KIB,
            "G" | "GB" | "GIB" => KIB * KIB * KIB,
            "T" | "TB" | "TIB" => KIB * KIB * KIB * KIB,
            "P" | "PB" | "PIB" => KIB * KIB * KIB * KIB * KIB,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };
        if number < 0.0 {
            return Err(ParseError::InvalidNumber(raw.to_string()));
        }
        Ok((number * multiplier) as u64)
    }

    /// Parse a duration into milliseconds.
    ///
    /// Accepts single values (`1.2 s`, `345 ms`, `2.5 m`) and concatenated
    /// forms (`1s727ms`, `9m41s`). A bare number is taken as milliseconds.
    pub fn parse_duration_ms(raw: &str) -> ParseResult<f64> {
        let value = Self::primary_value(raw);
        if value.is_empty() {
            return Err(ParseError::InvalidNumber(raw.to_string()));
        }

        if let Some(caps) = LEADING_NUMBER_REGEX.captures(value)
            && caps.get(2).is_none_or(|m| m.as_str().is_empty())
        {
            return Self::parse_number(value);
        }

        let mut total = 0.0;
        let mut consumed = 0;
        for caps in DURATION_PART_REGEX.captures_iter(value) {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            consumed += whole.chars().filter(|c| !c.is_whitespace()).count();

            let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("").replace(',', "");
            let number: f64 =
                digits.parse().map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
            let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            total += number * Self::duration_unit_to_ms(unit)?;
        }

        let expected = value.chars().filter(|c| !c.is_whitespace()).count();
        if consumed == 0 || consumed != expected {
            return Err(ParseError::InvalidNumber(raw.to_string()));
        }
        Ok(total)
    }

    fn duration_unit_to_ms(unit: &str) -> ParseResult<f64> {
        match unit {
            "ns" => Ok(1.0 / 1_000_000.0),
            "us" | "µs" => Ok(1.0 / 1_000.0),
            "ms" => Ok(1.0),
            "s" | "sec" => Ok(1_000.0),
            "m" | "min" => Ok(60_000.0),
            "h" => Ok(3_600_000.0),
            other => Err(ParseError::InvalidUnit(other.to_string())),
        }
    }

    /// Format a count with thousands separators (`1234567` -> `1,234,567`)
    pub fn format_count(count: u64) -> String {
        let digits = count.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }

    /// Two-decimal percentage with a `%` suffix
    pub fn format_percentage(value: f64) -> String {
        format!("{:.2}%", value)
    }

    /// One-decimal multiplier with an `X` suffix
    pub fn format_ratio(value: f64) -> String {
        format!("{:.1}X", value)
    }
}
