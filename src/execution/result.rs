//! Query Result - tabular data or the store's failure, captured as data

use itertools::Itertools;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One result row, keyed by column name in result order.
pub type Row = serde_json::Map<String, Value>;

/// Materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cells(&self, row: &Row) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| row.get(c).map(format_cell).unwrap_or_else(|| "NULL".to_string()))
            .collect()
    }

    /// Markdown table: header row, separator, then one line per row.
    /// A result without rows renders as header and separator only.
    pub fn to_markdown(&self) -> String {
        let escape = |s: &str| s.replace('|', "\\|").replace(['\r', '\n'], " ");
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!("| {} |", self.columns.iter().map(|c| escape(c.as_str())).join(" | ")));
        lines.push(format!("|{}|", self.columns.iter().map(|_| " --- ").join("|")));
        for row in &self.rows {
            lines.push(format!("| {} |", self.cells(row).iter().map(|c| escape(c.as_str())).join(" | ")));
        }
        lines.join("\n")
    }

    /// Right-aligned plain text table for terminals.
    pub fn to_plain_text(&self) -> String {
        let cells: Vec<Vec<String>> = self.rows.iter().map(|r| self.cells(r)).collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render_line = |values: &[String]| {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:>width$}", v, width = *w))
                .join("  ")
        };

        let mut out = render_line(self.columns.as_slice());
        if cells.is_empty() {
            out.push_str("\n(no rows)");
        }
        for row in &cells {
            out.push('\n');
            out.push_str(&render_line(row.as_slice()));
        }
        out
    }
}

/// Failure reported by the relational store. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(diagnostic: impl fmt::Display) -> Self {
        Self {
            message: format!("SQL Error: {}", diagnostic),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of running one statement. Callers must branch on the variant
/// before treating it as tabular data.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Table(ResultTable),
    Failed(ExecutionError),
}

impl QueryResult {
    pub fn failed(diagnostic: impl fmt::Display) -> Self {
        QueryResult::Failed(ExecutionError::new(diagnostic))
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            QueryResult::Table(t) => Some(t),
            QueryResult::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryResult::Failed(_))
    }
}

/// Rows as an array of objects, or the error text as a plain string.
impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            QueryResult::Table(t) => t.rows.serialize(serializer),
            QueryResult::Failed(e) => serializer.serialize_str(&e.message),
        }
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
