//! Pull-based row iteration returned to callers in place of a materialized
//! result set.

pub mod cursor;
pub mod sources;

pub use cursor::{Cursor, PageSource, MAX_LOAD_ATTEMPTS};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Column name of the synthetic record-id pseudo-column.
pub const RECORD_ID_COLUMN: &str = "record_id";

/// One projected output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Compact JSON rendering of a structured field value.
    Json(String),
}

impl Cell {
    pub fn display(&self) -> String {
        match self {
            Cell::Null => "NULL".to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Timestamp(ts) => ts.to_string(),
            Cell::Json(s) => s.clone(),
        }
    }

    /// Convert a raw JSON value into its natural cell form.
    pub fn from_json(value: &serde_json::Value) -> Cell {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else {
                    Cell::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Json(one_line(other)),
        }
    }
}

/// Compact one-line JSON rendering, used for sort strings, projected field
/// name lists and structured cell output.
pub fn one_line<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Row iteration contract handed back by statement execution. Each `next`
/// may trigger a backend page fetch. Cursors are owned by exactly one
/// in-flight statement and are not safe for concurrent iteration.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// Next projected row, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Vec<Cell>>>;
}

impl std::fmt::Debug for dyn Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns())
            .finish_non_exhaustive()
    }
}

/// In-memory rows for synthetic results (version strings, DDL echoes).
pub struct MemoryRows {
    columns: Vec<String>,
    items: std::vec::IntoIter<Vec<Cell>>,
}

impl MemoryRows {
    pub fn new(columns: Vec<String>, items: Vec<Vec<Cell>>) -> MemoryRows {
        MemoryRows {
            columns,
            items: items.into_iter(),
        }
    }
}

#[async_trait]
impl Rows for MemoryRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Cell>>> {
        Ok(self.items.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Null.display(), "NULL");
        assert_eq!(Cell::Bool(true).display(), "true");
        assert_eq!(Cell::Int(-3).display(), "-3");
        assert_eq!(Cell::Float(2.5).display(), "2.5");
        assert_eq!(Cell::Text("héllo".into()).display(), "héllo");
        assert_eq!(Cell::Json(r#"[{"id":"u1"}]"#.into()).display(), r#"[{"id":"u1"}]"#);
    }

    #[test]
    fn test_cell_from_json() {
        assert_eq!(Cell::from_json(&serde_json::json!(null)), Cell::Null);
        assert_eq!(Cell::from_json(&serde_json::json!(7)), Cell::Int(7));
        assert_eq!(Cell::from_json(&serde_json::json!(1.5)), Cell::Float(1.5));
        assert_eq!(
            Cell::from_json(&serde_json::json!("文本")),
            Cell::Text("文本".into())
        );
        assert_eq!(
            Cell::from_json(&serde_json::json!(["a", "b"])),
            Cell::Json(r#"["a","b"]"#.into())
        );
    }

    #[tokio::test]
    async fn test_memory_rows_drain() {
        let mut rows = MemoryRows::new(
            vec!["table".into()],
            vec![vec![Cell::Text("tbl1".into())]],
        );
        assert_eq!(rows.columns(), &["table".to_string()]);
        assert_eq!(rows.next().await.unwrap(), Some(vec![Cell::Text("tbl1".into())]));
        assert_eq!(rows.next().await.unwrap(), None);
        assert_eq!(rows.next().await.unwrap(), None);
    }
}
