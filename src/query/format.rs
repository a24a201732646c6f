//! Output rendering.
//!
//! Formatting is a pure function of the result and the requested format;
//! nothing here touches a connection.

use base64::Engine;

use crate::db::{QueryResult, Value};
use crate::error::{DbQueryError, Result};

/// Message rendered when a statement produced no column metadata.
pub(crate) const NO_RESULTS_MESSAGE: &str =
    "Query executed successfully (no results returned).";

/// Supported output renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned plain-text grid with a row-count summary.
    #[default]
    Table,
    /// Array of field-to-value objects.
    Json,
    /// Header row plus data rows with standard quoting.
    Csv,
}

impl OutputFormat {
    /// Returns the format's canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Parses a format name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(DbQueryError::request(format!(
                "unknown output format '{other}' (expected table, json, or csv)"
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = DbQueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Renders a result in the requested format.
pub(crate) fn render(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(result),
        OutputFormat::Json => render_json(result),
        OutputFormat::Csv => render_csv(result),
    }
}

fn truncation_notice(result: &QueryResult) -> String {
    format!(
        "[Showing {} of more rows. Increase max_rows to see more.]",
        result.row_count
    )
}

fn render_json(result: &QueryResult) -> String {
    let objects: Vec<serde_json::Value> = result
        .rows
        .iter()
        .map(|row| {
            let map: serde_json::Map<String, serde_json::Value> = result
                .columns
                .iter()
                .zip(row.iter())
                .map(|(col, value)| (col.name.clone(), value_to_json(value)))
                .collect();
            serde_json::Value::Object(map)
        })
        .collect();

    let mut out = serde_json::to_string_pretty(&objects)
        .unwrap_or_else(|_| "[]".to_string());
    if result.was_truncated {
        out.push_str("\n\n");
        out.push_str(&truncation_notice(result));
    }
    out
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        Value::String(s) => serde_json::Value::String(s.clone()),
        // Binary has no JSON analogue; widen to base64 text.
        Value::Bytes(b) => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    }
}

fn render_csv(result: &QueryResult) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let headers: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    let _ = writer.write_record(&headers);
    for row in &result.rows {
        let record: Vec<String> = row.iter().map(csv_cell).collect();
        let _ = writer.write_record(&record);
    }

    let mut out = writer
        .into_inner()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    if result.was_truncated {
        // Trailing unquoted line, outside the CSV body.
        out.push_str(&truncation_notice(result));
    }
    out
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bytes(b) => base64::engine::general_purpose::STANDARD.encode(b),
        other => other.to_display_string(),
    }
}

fn render_table(result: &QueryResult) -> String {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.len()).collect();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(format_row(
        &result
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>(),
        &widths,
    ));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(format_row(row, &widths));
    }

    let mut out = lines.join("\n");
    if result.was_truncated {
        out.push_str("\n\n");
        out.push_str(&truncation_notice(result));
    }
    out.push_str("\n\n");
    out.push_str(&row_summary(result));
    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let last = cells.len().saturating_sub(1);
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i == last {
                cell.clone()
            } else {
                format!("{:<width$}", cell, width = widths[i])
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn row_summary(result: &QueryResult) -> String {
    if result.was_truncated {
        format!("{}+ (truncated) row(s)", result.row_count)
    } else {
        format!("{} row(s)", result.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, QueryResult};
    use pretty_assertions::assert_eq;

    fn sample_result() -> QueryResult {
        QueryResult::with_data(
            vec![
                ColumnInfo::new("id", "INTEGER"),
                ColumnInfo::new("name", "TEXT"),
            ],
            vec![
                vec![Value::Int(1), Value::String("Alice".to_string())],
                vec![Value::Int(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::parse(" JSON ").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("csv").unwrap(), OutputFormat::Csv);
        assert!(matches!(
            OutputFormat::parse("yaml").unwrap_err(),
            DbQueryError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_render_table() {
        let out = render(&sample_result(), OutputFormat::Table);
        assert_eq!(
            out,
            "id | name\n---+------\n1  | Alice\n2  | NULL\n\n2 row(s)"
        );
    }

    #[test]
    fn test_render_json_round_trips() {
        let out = render(&sample_result(), OutputFormat::Json);
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["id"], serde_json::json!(1));
        assert_eq!(parsed[0]["name"], serde_json::json!("Alice"));
        assert_eq!(parsed[1]["name"], serde_json::Value::Null);
    }

    #[test]
    fn test_render_json_widens_bytes_to_base64() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("payload", "BLOB")],
            vec![vec![Value::Bytes(vec![1, 2, 3])]],
        );
        let out = render(&result, OutputFormat::Json);
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["payload"], serde_json::json!("AQID"));
    }

    #[test]
    fn test_render_csv_quotes_embedded_commas() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("note", "TEXT")],
            vec![vec![Value::String("a,b".to_string())]],
        );
        let out = render(&result, OutputFormat::Csv);
        assert_eq!(out, "note\n\"a,b\"\n");
    }

    #[test]
    fn test_truncation_suffix_present_in_every_format() {
        let result = sample_result().truncate_to(1);
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
            let out = render(&result, format);
            assert!(
                out.contains("[Showing 1 of more rows."),
                "{format} output missing truncation notice"
            );
        }
    }

    #[test]
    fn test_no_truncation_suffix_when_complete() {
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
            let out = render(&sample_result(), format);
            assert!(!out.contains("[Showing"), "{format} output has stray notice");
        }
    }

    #[test]
    fn test_table_summary_marks_truncation() {
        let out = render(&sample_result().truncate_to(1), OutputFormat::Table);
        assert!(out.ends_with("1+ (truncated) row(s)"));
    }
}
