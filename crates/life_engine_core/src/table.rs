//! crates/life_engine_core/src/table.rs
//!
//! Renders records through column definitions. The table never sorts; rows
//! come out in the order the binding delivered them.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::domain::Document;

pub type CellRenderer<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Anything a table can pull raw field values out of.
pub trait RowSource {
    fn field(&self, key: &str) -> Option<Value>;
}

impl RowSource for Document {
    fn field(&self, key: &str) -> Option<Value> {
        self.value(key)
    }
}

pub struct ColumnDef<T> {
    pub key: &'static str,
    pub header: &'static str,
    pub cell: Option<CellRenderer<T>>,
}

impl<T> ColumnDef<T> {
    pub fn raw(key: &'static str, header: &'static str) -> Self {
        Self {
            key,
            header,
            cell: None,
        }
    }

    pub fn rendered(
        key: &'static str,
        header: &'static str,
        cell: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            header,
            cell: Some(Arc::new(cell)),
        }
    }
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            header: self.header,
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("custom_cell", &self.cell.is_some())
            .finish()
    }
}

/// Shown in place of rows when a resolved collection is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TableView {
    Loading,
    Empty(EmptyState),
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl TableView {
    pub fn row_count(&self) -> usize {
        match self {
            TableView::Rows { rows, .. } => rows.len(),
            _ => 0,
        }
    }
}

/// Renders `records` (or `None` while unresolved) into a table view.
pub fn render_table<T: RowSource>(
    records: Option<&[T]>,
    columns: &[ColumnDef<T>],
    empty: &EmptyState,
) -> TableView {
    let Some(records) = records else {
        return TableView::Loading;
    };
    if records.is_empty() {
        return TableView::Empty(empty.clone());
    }

    let headers = columns.iter().map(|c| c.header.to_string()).collect();
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| match &column.cell {
                    Some(render) => render(record),
                    None => display_value(record.field(column.key).as_ref()),
                })
                .collect()
        })
        .collect();
    TableView::Rows { headers, rows }
}

/// The raw cell text for a field value.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
