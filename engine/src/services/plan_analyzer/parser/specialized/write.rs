//! WriteToHDFS plan parser
//!
//! Parses the argument list of `Execute InsertIntoHadoopFsRelationCommand`:
//! ```text
//! Execute InsertIntoHadoopFsRelationCommand file:/warehouse/sales, false, [year#4],
//!   Parquet, [path=file:/warehouse/sales], Append, `spark_catalog`.`db`.`sales`, ..., [id, amount, year]
//! ```
//! Optional arguments are omitted by the engine when unset, so fields are located by shape
//! rather than by position.

use crate::services::plan_analyzer::models::ParsedWriteToHdfsPlan;
use crate::services::plan_analyzer::parser::core::expression::{split_top_level, strip_expr_ids};
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};

const SAVE_MODES: [&str; 4] = ["Append", "Overwrite", "ErrorIfExists", "Ignore"];
const FILE_FORMATS: [&str; 7] = ["Parquet", "ORC", "CSV", "JSON", "Text", "Avro", "Delta"];

pub fn parse_write_to_hdfs(text: &str) -> ParseResult<ParsedWriteToHdfsPlan> {
    let clean = strip_expr_ids(text);
    let arguments = match clean.find("Command") {
        Some(pos) => clean[pos + "Command".len()..].trim(),
        None => return Err(ParseError::unrecognized("WriteToHDFS", text)),
    };

    let parts = split_top_level(arguments, ',');
    let location = parts
        .first()
        .filter(|p| !p.starts_with('['))
        .cloned()
        .ok_or_else(|| ParseError::missing_field("WriteToHDFS", "location"))?;

    let mode = parts
        .iter()
        .find(|p| SAVE_MODES.contains(&p.as_str()))
        .cloned()
        .ok_or_else(|| ParseError::missing_field("WriteToHDFS", "mode"))?;

    let format_index = parts.iter().position(|p| file_format(p).is_some());
    let format = format_index.and_then(|i| file_format(&parts[i]));

    // Partition columns are the bracket list between the location and the format
    let partition_keys = parts
        .iter()
        .take(format_index.unwrap_or(parts.len()))
        .skip(1)
        .find(|p| p.starts_with('[') && !p.contains('='))
        .map(|p| split_top_level(p.trim_start_matches('[').trim_end_matches(']'), ','))
        .unwrap_or_default();

    let table_name = parts
        .iter()
        .find(|p| p.starts_with('`'))
        .map(|p| p.replace('`', ""));

    Ok(ParsedWriteToHdfsPlan { location, format, mode, partition_keys, table_name })
}

/// Recognize `Parquet` as well as `org.apache...parquet.ParquetFileFormat@1a2b`
fn file_format(part: &str) -> Option<String> {
    if let Some(known) = FILE_FORMATS.iter().find(|f| f.eq_ignore_ascii_case(part)) {
        return Some(known.to_string());
    }
    let class_name = part.rsplit('.').next()?;
    let class_name = class_name.split('@').next()?;
    class_name
        .strip_suffix("FileFormat")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partitioned_table_write() {
        let plan = parse_write_to_hdfs(
            "Execute InsertIntoHadoopFsRelationCommand file:/warehouse/sales, false, [year#4], Parquet, [path=file:/warehouse/sales], Append, `spark_catalog`.`db`.`sales`, org.apache.spark.sql.execution.datasources.CatalogFileIndex(file:/warehouse/sales), [id, amount, year]",
        )
        .unwrap();
        assert_eq!(plan.location, "file:/warehouse/sales");
        assert_eq!(plan.format.as_deref(), Some("Parquet"));
        assert_eq!(plan.mode, "Append");
        assert_eq!(plan.partition_keys, vec!["year"]);
        assert_eq!(plan.table_name.as_deref(), Some("spark_catalog.db.sales"));
    }

    #[test]
    fn test_parse_path_write_with_format_class() {
        let plan = parse_write_to_hdfs(
            "Execute InsertIntoHadoopFsRelationCommand file:/tmp/out, false, org.apache.spark.sql.execution.datasources.orc.OrcFileFormat@5e1f, [path=/tmp/out], Overwrite, [a, b]",
        )
        .unwrap();
        assert_eq!(plan.format.as_deref(), Some("Orc"));
        assert_eq!(plan.mode, "Overwrite");
        assert!(plan.partition_keys.is_empty());
        assert!(plan.table_name.is_none());
    }

    #[test]
    fn test_write_without_mode() {
        assert!(parse_write_to_hdfs("Execute InsertIntoHadoopFsRelationCommand file:/x, false").is_err());
        assert!(parse_write_to_hdfs("Project [a]").is_err());
    }
}
