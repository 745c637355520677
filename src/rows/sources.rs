//! Concrete page sources for the five listed entity kinds. Each supplies
//! only its backend call and projection; iteration, bounding and limit
//! enforcement live in the cursor engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, ResultExt};
use crate::rows::cursor::PageSource;
use crate::rows::{one_line, Cell, RECORD_ID_COLUMN};
use crate::sql::fields::output_cell;
use crate::store::{App, Field, Page, Record, Table, TableStore, View, DEFAULT_PAGE_SIZE};

/// One-shot source for the active application's metadata.
pub struct AppSource {
    store: Arc<dyn TableStore>,
    app_token: String,
    done: bool,
}

impl AppSource {
    pub fn new(store: Arc<dyn TableStore>, app_token: impl Into<String>) -> AppSource {
        AppSource {
            store,
            app_token: app_token.into(),
            done: false,
        }
    }
}

#[async_trait]
impl PageSource for AppSource {
    type Item = App;

    fn columns(&self) -> Vec<String> {
        vec!["app_token".into(), "name".into(), "revision".into()]
    }

    async fn load(&mut self, _page_token: Option<&str>) -> Result<Page<App>> {
        if self.done {
            return Ok(Page::empty());
        }
        self.done = true;
        let app = self
            .store
            .get_app(&self.app_token)
            .await
            .ctx(format!("get app {}", self.app_token))?;
        Ok(Page::of(vec![app]))
    }

    fn pick(&self, item: &App) -> Vec<Cell> {
        vec![
            Cell::Text(item.app_token.clone()),
            Cell::Text(item.name.clone()),
            Cell::Int(item.revision),
        ]
    }
}

/// Paginated table listing for the active application.
pub struct TableSource {
    store: Arc<dyn TableStore>,
    app_token: String,
}

impl TableSource {
    pub fn new(store: Arc<dyn TableStore>, app_token: impl Into<String>) -> TableSource {
        TableSource {
            store,
            app_token: app_token.into(),
        }
    }
}

#[async_trait]
impl PageSource for TableSource {
    type Item = Table;

    fn columns(&self) -> Vec<String> {
        vec!["id".into(), "name".into(), "revision".into()]
    }

    async fn load(&mut self, page_token: Option<&str>) -> Result<Page<Table>> {
        self.store
            .list_tables(&self.app_token, page_token, DEFAULT_PAGE_SIZE)
            .await
            .ctx("list tables")
    }

    fn pick(&self, item: &Table) -> Vec<Cell> {
        vec![
            Cell::Text(item.table_id.clone()),
            Cell::Text(item.name.clone()),
            Cell::Int(item.revision),
        ]
    }
}

/// Paginated view listing for one table.
pub struct ViewSource {
    store: Arc<dyn TableStore>,
    app_token: String,
    table_id: String,
}

impl ViewSource {
    pub fn new(
        store: Arc<dyn TableStore>,
        app_token: impl Into<String>,
        table_id: impl Into<String>,
    ) -> ViewSource {
        ViewSource {
            store,
            app_token: app_token.into(),
            table_id: table_id.into(),
        }
    }
}

#[async_trait]
impl PageSource for ViewSource {
    type Item = View;

    fn columns(&self) -> Vec<String> {
        vec!["id".into(), "name".into(), "type".into()]
    }

    async fn load(&mut self, page_token: Option<&str>) -> Result<Page<View>> {
        self.store
            .list_views(&self.app_token, &self.table_id, page_token, DEFAULT_PAGE_SIZE)
            .await
            .ctx(format!("list views of {}", self.table_id))
    }

    fn pick(&self, item: &View) -> Vec<Cell> {
        vec![
            Cell::Text(item.view_id.clone()),
            Cell::Text(item.view_name.clone()),
            Cell::Text(item.view_type.clone()),
        ]
    }
}

/// Paginated field listing for one table (optionally scoped to a view).
/// The property blob is projected as one-line JSON in the `extra` column.
pub struct FieldSource {
    store: Arc<dyn TableStore>,
    app_token: String,
    table_id: String,
    view_id: String,
}

impl FieldSource {
    pub fn new(
        store: Arc<dyn TableStore>,
        app_token: impl Into<String>,
        table_id: impl Into<String>,
        view_id: impl Into<String>,
    ) -> FieldSource {
        FieldSource {
            store,
            app_token: app_token.into(),
            table_id: table_id.into(),
            view_id: view_id.into(),
        }
    }
}

#[async_trait]
impl PageSource for FieldSource {
    type Item = Field;

    fn columns(&self) -> Vec<String> {
        vec!["id".into(), "type".into(), "name".into(), "extra".into()]
    }

    async fn load(&mut self, page_token: Option<&str>) -> Result<Page<Field>> {
        self.store
            .list_fields(
                &self.app_token,
                &self.table_id,
                &self.view_id,
                page_token,
                DEFAULT_PAGE_SIZE,
            )
            .await
            .ctx(format!("list fields of {}", self.table_id))
    }

    fn pick(&self, item: &Field) -> Vec<Cell> {
        vec![
            Cell::Text(item.field_id.clone()),
            Cell::Int(item.field_type),
            Cell::Text(item.field_name.clone()),
            Cell::Json(one_line(&item.property)),
        ]
    }
}

/// Record listing with filter/sort/projection, or a single point lookup when
/// the record-id shortcut applies. Output coercion runs through the stored
/// field metadata.
pub struct RecordSource {
    store: Arc<dyn TableStore>,
    app_token: String,
    table_id: String,
    view_id: String,
    /// Compact JSON array of projected field names; empty for all fields.
    field_names: String,
    filter: String,
    sort: String,
    record_id: String,
    columns: Vec<String>,
    fields: HashMap<String, Field>,
    limit: i64,
    done: bool,
}

impl RecordSource {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn TableStore>,
        app_token: impl Into<String>,
        table_id: impl Into<String>,
        view_id: impl Into<String>,
        query_fields: Vec<String>,
        fields: HashMap<String, Field>,
        filter: String,
        sort: String,
        record_id: String,
        limit: i64,
    ) -> RecordSource {
        let field_names = if query_fields.is_empty() {
            String::new()
        } else {
            one_line(&query_fields)
        };
        let mut columns = Vec::with_capacity(query_fields.len() + 1);
        columns.push(RECORD_ID_COLUMN.to_string());
        columns.extend(query_fields);
        RecordSource {
            store,
            app_token: app_token.into(),
            table_id: table_id.into(),
            view_id: view_id.into(),
            field_names,
            filter,
            sort,
            record_id,
            columns,
            fields,
            limit,
            done: false,
        }
    }
}

#[async_trait]
impl PageSource for RecordSource {
    type Item = Record;

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    async fn load(&mut self, page_token: Option<&str>) -> Result<Page<Record>> {
        if !self.record_id.is_empty() {
            if self.done {
                return Ok(Page::empty());
            }
            self.done = true;
            let record = self
                .store
                .get_record(&self.app_token, &self.table_id, &self.record_id)
                .await
                .ctx(format!("get record {}", self.record_id))?;
            return Ok(Page::of(vec![record]));
        }
        let mut page_size = DEFAULT_PAGE_SIZE;
        if self.limit > 0 && self.limit < page_size {
            page_size = self.limit;
        }
        self.store
            .list_records(
                &self.app_token,
                &self.table_id,
                &self.view_id,
                &self.field_names,
                &self.filter,
                &self.sort,
                page_token,
                page_size,
            )
            .await
            .ctx(format!("list records of {}", self.table_id))
    }

    fn pick(&self, item: &Record) -> Vec<Cell> {
        let mut row = Vec::with_capacity(self.columns.len());
        row.push(Cell::Text(item.record_id.clone()));
        for column in self.columns.iter().skip(1) {
            let value = item.fields.get(column);
            let cell = match self.fields.get(column) {
                Some(field) => output_cell(field.field_type, value),
                None => match value {
                    Some(v) => Cell::Json(one_line(v)),
                    None => Cell::Null,
                },
            };
            row.push(cell);
        }
        row
    }
}
