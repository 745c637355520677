//! Statement dispatch: one compiler path per supported statement kind.
//!
//! Dispatch is a closed match over the parser's statement enum; anything
//! outside the supported surface fails with `UnsupportedStatement` instead
//! of reaching the backend. Statements that produce rows hand back a cursor;
//! void statements return `None`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use sqlparser::ast::{
    AlterTableOperation, Assignment, AssignmentTarget, ColumnOption, ColumnOptionDef, CommentDef,
    CreateTable, Delete, Expr, FromTable, Insert, ObjectName, ObjectType, Query, SelectItem,
    SetExpr, ShowCreateObject, Statement, TableFactor, TableWithJoins, Use, Value,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::driver::Connection;
use crate::error::{Error, Result, ResultExt};
use crate::rows::cursor::{Cursor, MAX_LOAD_ATTEMPTS};
use crate::rows::sources::{AppSource, FieldSource, RecordSource, TableSource, ViewSource};
use crate::rows::{one_line, Cell, MemoryRows, Rows, RECORD_ID_COLUMN};
use crate::sql::context::{Param, StatementContext};
use crate::sql::fields::sql_type_to_field_type;
use crate::sql::filter::{translate_filter, translate_sort};
use crate::store::{
    Attachments, Field, FieldValues, Link, Options, Persons, TableStore, ViewType,
    DEFAULT_PAGE_SIZE,
};

/// Filter prefix produced by a bare `record_id = <literal>` predicate.
const RECORD_ID_FILTER_PREFIX: &str = "CurrentValue.[record_id] = ";

/// Parse and execute one statement against the connection's active
/// application. Returns a cursor for row-producing statements.
pub async fn execute(
    conn: &mut Connection,
    query: &str,
    params: Vec<Param>,
) -> Result<Option<Box<dyn Rows>>> {
    let mut statements = Parser::parse_sql(&MySqlDialect {}, query)?;
    if statements.len() != 1 {
        return Err(Error::UnsupportedStatement(format!(
            "expected one statement, found {}",
            statements.len()
        )));
    }
    let statement = statements.remove(0);
    let mut ctx = StatementContext::new(query, params)?;

    let store = conn.store();
    let app_token = conn.app_token().to_string();
    debug!(%query, %app_token, "dispatch statement");

    match statement {
        Statement::Use(target) => use_stmt(conn, target).await,
        Statement::ShowDatabases { .. } => app_rows(&store, &app_token),
        Statement::ShowVariable { variable } => {
            match variable.first() {
                Some(ident) if ident.value.eq_ignore_ascii_case("databases") => {
                    app_rows(&store, &app_token)
                }
                // parser coverage gap: unrecognized SHOW forms yield no rows
                _ => Ok(None),
            }
        }
        Statement::ShowTables { .. } => Ok(Some(
            Cursor::new(TableSource::new(store.clone(), &app_token)).boxed(),
        )),
        Statement::ShowCreate {
            obj_type: ShowCreateObject::View,
            obj_name,
        } => {
            let (table, _) = table_and_view(&obj_name)?;
            Ok(Some(
                Cursor::new(ViewSource::new(store.clone(), &app_token, table)).boxed(),
            ))
        }
        Statement::ShowCreate { .. } => Ok(None),
        Statement::ShowColumns { show_options, .. } => {
            let name = show_options
                .show_in
                .and_then(|show_in| show_in.parent_name)
                .ok_or_else(|| Error::TableNotFound("SHOW COLUMNS without a table".into()))?;
            let (table, _) = table_and_view(&name)?;
            Ok(Some(
                Cursor::new(FieldSource::new(store.clone(), &app_token, table, "")).boxed(),
            ))
        }
        Statement::ShowViews { .. } => Ok(None),
        Statement::Query(q) => select_stmt(&store, &app_token, *q, &mut ctx).await,
        Statement::CreateTable(create) => create_table_stmt(&store, &app_token, create).await,
        Statement::CreateView { name, query, .. } => {
            create_view_stmt(&store, &app_token, &name, *query).await
        }
        Statement::Drop {
            object_type, names, ..
        } => drop_stmt(&store, &app_token, object_type, &names).await,
        Statement::AlterTable {
            name, operations, ..
        } => alter_table_stmt(&store, &app_token, &name, operations).await,
        Statement::Insert(insert) => insert_stmt(&store, &app_token, insert, &mut ctx).await,
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => update_stmt(&store, &app_token, &table, &assignments, selection, &mut ctx).await,
        Statement::Delete(delete) => delete_stmt(&store, &app_token, delete, &mut ctx).await,
        other => Err(Error::UnsupportedStatement(other.to_string())),
    }
}

/// `USE <app_token>`: verify the target exists, then rebind the connection's
/// active application for the remainder of its life.
async fn use_stmt(conn: &mut Connection, target: Use) -> Result<Option<Box<dyn Rows>>> {
    let name = match target {
        Use::Object(name)
        | Use::Database(name)
        | Use::Schema(name)
        | Use::Catalog(name)
        | Use::Warehouse(name) => match name.0.first() {
            Some(ident) => ident.value.clone(),
            None => return Err(Error::DatabaseNotFound("empty USE target".into())),
        },
        other => return Err(Error::UnsupportedStatement(format!("USE {other}"))),
    };
    conn.store()
        .get_app(&name)
        .await
        .map_err(|e| Error::DatabaseNotFound(format!("{name}: {e}")))?;
    conn.set_app_token(name);
    Ok(None)
}

fn app_rows(store: &Arc<dyn TableStore>, app_token: &str) -> Result<Option<Box<dyn Rows>>> {
    Ok(Some(
        Cursor::new(AppSource::new(store.clone(), app_token)).boxed(),
    ))
}

async fn select_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    query: Query,
    ctx: &mut StatementContext,
) -> Result<Option<Box<dyn Rows>>> {
    let select = match *query.body {
        SetExpr::Select(select) => select,
        other => return Err(Error::UnsupportedStatement(other.to_string())),
    };

    let projected = projection_names(&select.projection);
    if let Some(names) = &projected {
        if names.len() == 1 && names[0].eq_ignore_ascii_case("version()") {
            let rows = MemoryRows::new(
                names.clone(),
                vec![vec![Cell::Text(crate::VERSION.to_string())]],
            );
            return Ok(Some(Box::new(rows)));
        }
    }

    let (table, view) = from_table(&select.from)?;
    let limit = limit_value(query.limit.as_ref());
    let filter = translate_filter(select.selection.as_ref(), ctx).ctx("compile filter")?;
    let (filter, record_id) = extract_record_id(filter);
    let order_by = query.order_by.map(|ob| ob.exprs).unwrap_or_default();
    let sort = translate_sort(&order_by);

    let fields = load_fields(store, app_token, &table).await?;
    let query_fields = match projected {
        Some(names) => names,
        None => fields.keys().cloned().collect(),
    };

    let source = RecordSource::new(
        store.clone(),
        app_token,
        table,
        view,
        query_fields,
        fields,
        filter,
        sort,
        record_id,
        limit,
    );
    Ok(Some(Cursor::with_limit(source, limit).boxed()))
}

async fn create_table_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    create: CreateTable,
) -> Result<Option<Box<dyn Rows>>> {
    let (table_name, _) = table_and_view(&create.name)?;
    let table_id = store
        .create_table(app_token, &table_name)
        .await
        .ctx(format!("create table {table_name}"))?;

    // a table-level comment renames the auto-created default view
    let view_name = table_comment(create.comment.as_ref());
    if !view_name.is_empty() {
        let views = store
            .list_views(app_token, &table_id, None, 10)
            .await
            .ctx("list default view")?;
        store
            .create_view(app_token, &table_id, &view_name, ViewType::Grid.as_str())
            .await
            .ctx("create named view")?;
        if let Some(default_view) = views.items.first() {
            store
                .drop_view(app_token, &table_id, &default_view.view_id)
                .await
                .ctx("drop default view")?;
        }
    }

    for (position, column) in create.columns.iter().enumerate() {
        let field_name = column.name.value.clone();
        let field_type = sql_type_to_field_type(&column.data_type);
        let property = column_comment(&column.options);
        let applied = if position == 0 {
            rewrite_default_field(store, app_token, &table_id, &field_name, field_type, &property)
                .await
        } else {
            store
                .add_field(app_token, &table_id, &field_name, field_type, &property)
                .await
                .map(drop)
        };
        if let Err(e) = applied {
            warn!(field = %field_name, error = %e, "skipping column during CREATE TABLE");
        }
    }

    let rows = MemoryRows::new(vec!["table".into()], vec![vec![Cell::Text(table_id)]]);
    Ok(Some(Box::new(rows)))
}

/// The backend creates every table with one default field at position 0;
/// the first declared column overwrites it instead of adding a new one.
async fn rewrite_default_field(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table_id: &str,
    field_name: &str,
    field_type: i64,
    property: &str,
) -> Result<()> {
    let page = store
        .list_fields(app_token, table_id, "", None, 1)
        .await
        .ctx("list default field")?;
    let default_field = match page.items.first() {
        Some(field) => field,
        None => return Err(Error::FieldNotFound("default field".into())),
    };
    store
        .update_field(
            app_token,
            table_id,
            &default_field.field_id,
            field_name,
            field_type,
            property,
        )
        .await
        .ctx("rewrite default field")?;
    Ok(())
}

async fn create_view_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    name: &ObjectName,
    query: Query,
) -> Result<Option<Box<dyn Rows>>> {
    // a qualified view name selects the view type: `kanban.board`
    let (qualifier, rest) = table_and_view(name)?;
    let (view_type, view_name) = if rest.is_empty() {
        (ViewType::Grid.as_str().to_string(), qualifier)
    } else {
        (qualifier.to_lowercase(), rest)
    };

    let select = match *query.body {
        SetExpr::Select(select) => select,
        other => return Err(Error::UnsupportedStatement(other.to_string())),
    };
    let (table, _) = from_table(&select.from)?;

    let view = store
        .create_view(app_token, &table, &view_name, &view_type)
        .await
        .ctx(format!("create view {view_name}"))?;

    let rows = MemoryRows::new(
        vec!["id".into(), "name".into(), "type".into()],
        vec![vec![
            Cell::Text(view.view_id),
            Cell::Text(view.view_name),
            Cell::Text(view.view_type),
        ]],
    );
    Ok(Some(Box::new(rows)))
}

async fn drop_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    object_type: ObjectType,
    names: &[ObjectName],
) -> Result<Option<Box<dyn Rows>>> {
    for name in names {
        let (table, view) = table_and_view(name)?;
        match object_type {
            ObjectType::View => {
                store
                    .drop_view(app_token, &table, &view)
                    .await
                    .ctx(format!("drop view {view}"))?;
            }
            ObjectType::Table => {
                store
                    .drop_table(app_token, &table)
                    .await
                    .ctx(format!("drop table {table}"))?;
            }
            other => {
                return Err(Error::UnsupportedStatement(format!("DROP {other}")));
            }
        }
    }
    Ok(None)
}

async fn alter_table_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    name: &ObjectName,
    operations: Vec<AlterTableOperation>,
) -> Result<Option<Box<dyn Rows>>> {
    let (table, _) = table_and_view(name)?;
    // every spec applies in order; the first cursor-producing spec wins the
    // result slot
    let mut result: Option<Box<dyn Rows>> = None;

    for operation in operations {
        match operation {
            AlterTableOperation::AddColumn { column_def, .. } => {
                let field_name = column_def.name.value.clone();
                let field_type = sql_type_to_field_type(&column_def.data_type);
                let property = column_comment(&column_def.options);
                match store
                    .add_field(app_token, &table, &field_name, field_type, &property)
                    .await
                {
                    Ok(field) => {
                        if result.is_none() {
                            let rows = MemoryRows::new(
                                vec![
                                    "field_id".into(),
                                    "name".into(),
                                    "type".into(),
                                    "property".into(),
                                ],
                                vec![vec![
                                    Cell::Text(field.field_id),
                                    Cell::Text(field.field_name),
                                    Cell::Int(field.field_type),
                                    Cell::Json(one_line(&field.property)),
                                ]],
                            );
                            result = Some(Box::new(rows));
                        }
                    }
                    Err(e) => {
                        warn!(field = %field_name, error = %e, "skipping ADD COLUMN");
                    }
                }
            }
            AlterTableOperation::DropColumn { column_name, .. } => {
                let field = find_field(store, app_token, &table, &column_name.value).await?;
                store
                    .delete_field(app_token, &table, &field.field_id)
                    .await
                    .ctx(format!("drop column {}", column_name.value))?;
            }
            AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => {
                let field = find_field(store, app_token, &table, &old_column_name.value).await?;
                let property = property_json(&field);
                store
                    .update_field(
                        app_token,
                        &table,
                        &field.field_id,
                        &new_column_name.value,
                        field.field_type,
                        &property,
                    )
                    .await
                    .ctx(format!("rename column {}", old_column_name.value))?;
            }
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                options,
                ..
            } => {
                let name = col_name.value.clone();
                modify_field(store, app_token, &table, &name, &name, &data_type, &options).await?;
            }
            AlterTableOperation::ChangeColumn {
                old_name,
                new_name,
                data_type,
                options,
                ..
            } => {
                modify_field(
                    store,
                    app_token,
                    &table,
                    &old_name.value,
                    &new_name.value,
                    &data_type,
                    &options,
                )
                .await?;
            }
            other => {
                debug!(operation = %other, "ignoring unsupported ALTER TABLE spec");
            }
        }
    }
    Ok(result)
}

/// MODIFY/CHANGE COLUMN: re-apply under the (possibly new) name, falling
/// back to the stored type and property when the spec omits one.
async fn modify_field(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table: &str,
    old_name: &str,
    new_name: &str,
    data_type: &sqlparser::ast::DataType,
    options: &[ColumnOption],
) -> Result<()> {
    let field = find_field(store, app_token, table, old_name).await?;
    let mut field_type = sql_type_to_field_type(data_type);
    if field_type == 0 {
        field_type = field.field_type;
    }
    let mut property = options
        .iter()
        .find_map(|option| match option {
            ColumnOption::Comment(comment) => Some(comment.clone()),
            _ => None,
        })
        .unwrap_or_default();
    if property.is_empty() {
        property = property_json(&field);
    }
    store
        .update_field(
            app_token,
            table,
            &field.field_id,
            new_name,
            field_type,
            &property,
        )
        .await
        .ctx(format!("modify column {old_name}"))?;
    Ok(())
}

async fn insert_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    insert: Insert,
    ctx: &mut StatementContext,
) -> Result<Option<Box<dyn Rows>>> {
    let (table, _) = table_and_view(&insert.table_name)?;
    let source = insert
        .source
        .ok_or_else(|| Error::UnsupportedStatement("INSERT without VALUES".into()))?;
    let values = match *source.body {
        SetExpr::Values(values) => values,
        other => return Err(Error::UnsupportedStatement(other.to_string())),
    };

    let columns: Vec<(Option<RecordKey>, String)> = insert
        .columns
        .iter()
        .map(|column| split_qualifier(&column.value))
        .collect();

    let mut batch: Vec<FieldValues> = Vec::with_capacity(values.rows.len());
    for row in &values.rows {
        if row.len() != columns.len() {
            return Err(Error::UnsupportedStatement(format!(
                "INSERT row has {} values for {} columns",
                row.len(),
                columns.len()
            )));
        }
        let mut record = FieldValues::new();
        for (expr, (qualifier, field_key)) in row.iter().zip(&columns) {
            // the record-id pseudo-column identifies rows, never stores data
            if field_key == RECORD_ID_COLUMN {
                continue;
            }
            let value = insert_value(expr, qualifier.as_ref(), ctx)?;
            record.insert(field_key.clone(), value);
        }
        if record.is_empty() {
            return Err(Error::EmptyInsert);
        }
        batch.push(record);
    }
    if batch.is_empty() {
        return Err(Error::EmptyInsert);
    }

    store
        .insert_records(app_token, &table, &batch)
        .await
        .ctx(format!("insert into {table}"))?;

    let column_names: Vec<String> = columns.into_iter().map(|(_, name)| name).collect();
    let items = batch
        .iter()
        .map(|record| {
            column_names
                .iter()
                .map(|column| match record.get(column) {
                    Some(value) => Cell::from_json(value),
                    None => Cell::Null,
                })
                .collect()
        })
        .collect();
    Ok(Some(Box::new(MemoryRows::new(column_names, items))))
}

/// Decode one INSERT value expression into a record field value.
fn insert_value(
    expr: &Expr,
    qualifier: Option<&RecordKey>,
    ctx: &mut StatementContext,
) -> Result<serde_json::Value> {
    // typed values bypass the qualifier decode entirely
    let text = match expr {
        Expr::Value(Value::Placeholder(_)) => match ctx.bind_next() {
            Some(Param::Int(i)) => return Ok(json!(i)),
            Some(Param::Float(f)) => return Ok(json!(f)),
            Some(Param::Bool(b)) => return Ok(json!(b)),
            Some(Param::Timestamp(ts)) => return Ok(json!(ts.timestamp_millis())),
            Some(Param::Text(s)) => s.clone(),
            Some(Param::Bytes(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            Some(Param::Null) | None => return Ok(json!("")),
        },
        Expr::Value(Value::SingleQuotedString(s)) | Expr::Value(Value::DoubleQuotedString(s)) => {
            s.clone()
        }
        Expr::Value(Value::Number(n, _)) => {
            if let Ok(i) = n.parse::<i64>() {
                return Ok(json!(i));
            }
            let f = n.parse::<f64>().map_err(|e| {
                Error::UnsupportedExpression(format!("numeric literal {n}: {e}"))
            })?;
            return Ok(json!(f));
        }
        Expr::Value(Value::Boolean(b)) => return Ok(json!(b)),
        other => return Err(Error::UnsupportedExpression(format!("insert value {other}"))),
    };

    if text.is_empty() {
        return Ok(json!(""));
    }

    match qualifier {
        Some(RecordKey::Url) => {
            let link: Link = serde_json::from_str(&text)
                .map_err(|e| Error::UnsupportedExpression(format!("url payload: {e}")))?;
            Ok(json!(link))
        }
        Some(RecordKey::Attachments) => {
            let attachments: Attachments = serde_json::from_str(&text)
                .map_err(|e| Error::UnsupportedExpression(format!("attachments payload: {e}")))?;
            Ok(json!(attachments))
        }
        Some(RecordKey::Options) => {
            let options: Options = serde_json::from_str(&text)
                .map_err(|e| Error::UnsupportedExpression(format!("options payload: {e}")))?;
            Ok(json!(options))
        }
        Some(RecordKey::Persons) => {
            let persons: Persons = serde_json::from_str(&text)
                .map_err(|e| Error::UnsupportedExpression(format!("persons payload: {e}")))?;
            Ok(json!(persons))
        }
        None => Ok(json!(text)),
    }
}

async fn update_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table: &TableWithJoins,
    assignments: &[Assignment],
    selection: Option<Expr>,
    ctx: &mut StatementContext,
) -> Result<Option<Box<dyn Rows>>> {
    let (table, view) = match &table.relation {
        TableFactor::Table { name, .. } => table_and_view(name)?,
        other => return Err(Error::TableNotFound(other.to_string())),
    };

    // SET list first: its placeholders precede the WHERE clause textually
    let mut data = FieldValues::new();
    for assignment in assignments {
        let column = match &assignment.target {
            AssignmentTarget::ColumnName(name) => match name.0.last() {
                Some(ident) => ident.value.clone(),
                None => continue,
            },
            other => {
                return Err(Error::UnsupportedStatement(format!("SET target {other}")));
            }
        };
        if let Some(value) = assignment_value(&assignment.value, ctx) {
            data.insert(column, value);
        }
    }
    data.remove(RECORD_ID_COLUMN);

    let filter = translate_filter(selection.as_ref(), ctx).ctx("compile filter")?;
    let (filter, record_id) = extract_record_id(filter);

    if !record_id.is_empty() {
        let updates = HashMap::from([(record_id.clone(), data)]);
        store
            .update_records(app_token, &table, &updates)
            .await
            .ctx(format!("update record {record_id}"))?;
        return Ok(None);
    }

    let affected = search_and_mutate(store, app_token, &table, &view, &filter, 0, |ids| {
        let store = store.clone();
        let app_token = app_token.to_string();
        let table = table.clone();
        let data = data.clone();
        async move {
            let updates: HashMap<String, FieldValues> =
                ids.into_iter().map(|id| (id, data.clone())).collect();
            let records = store.update_records(&app_token, &table, &updates).await?;
            Ok(records.len() as i64)
        }
    })
    .await?;
    debug!(affected, %table, "update complete");
    Ok(None)
}

/// Decode one SET value. Expressions outside the literal/placeholder surface
/// are skipped, leaving the field untouched.
fn assignment_value(expr: &Expr, ctx: &mut StatementContext) -> Option<serde_json::Value> {
    match expr {
        Expr::Value(Value::Placeholder(_)) => match ctx.bind_next() {
            Some(Param::Text(s)) => Some(json!(s)),
            Some(Param::Int(i)) => Some(json!(i)),
            Some(Param::Float(f)) => Some(json!(f)),
            Some(Param::Bool(b)) => Some(json!(b)),
            Some(Param::Timestamp(ts)) => Some(json!(ts.timestamp_millis())),
            Some(Param::Bytes(bytes)) => Some(json!(String::from_utf8_lossy(bytes))),
            Some(Param::Null) => Some(serde_json::Value::Null),
            None => None,
        },
        Expr::Value(Value::SingleQuotedString(s)) | Expr::Value(Value::DoubleQuotedString(s)) => {
            Some(json!(s))
        }
        Expr::Value(Value::Number(n, _)) => {
            if let Ok(i) = n.parse::<i64>() {
                Some(json!(i))
            } else {
                n.parse::<f64>().ok().map(|f| json!(f))
            }
        }
        Expr::Value(Value::Boolean(b)) => Some(json!(b)),
        Expr::Value(Value::Null) => Some(serde_json::Value::Null),
        other => {
            debug!(value = %other, "ignoring unsupported SET value");
            None
        }
    }
}

async fn delete_stmt(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    delete: Delete,
    ctx: &mut StatementContext,
) -> Result<Option<Box<dyn Rows>>> {
    let from = match &delete.from {
        FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
    };
    let (table, view) = from_table(from)?;

    let filter = translate_filter(delete.selection.as_ref(), ctx).ctx("compile filter")?;
    let (filter, record_id) = extract_record_id(filter);
    let limit = limit_value(delete.limit.as_ref());

    if !record_id.is_empty() {
        store
            .delete_record(app_token, &table, &record_id)
            .await
            .ctx(format!("delete record {record_id}"))?;
        return Ok(None);
    }

    let affected = search_and_mutate(store, app_token, &table, &view, &filter, limit, |ids| {
        let store = store.clone();
        let app_token = app_token.to_string();
        let table = table.clone();
        async move {
            // the backend has no batch delete
            let mut count = 0;
            for id in ids {
                if store.delete_record(&app_token, &table, &id).await? {
                    count += 1;
                }
            }
            Ok(count)
        }
    })
    .await?;
    debug!(affected, %table, "delete complete");
    Ok(None)
}

/// Paginate the records matching `filter`, feeding each page's record ids to
/// `mutate` and accumulating its returned count. The loop shares the cursor
/// engine's fetch ceiling; zero total matches is an error distinct from any
/// backend failure. Partial progress is preserved in the error context when
/// a later page's callback fails.
async fn search_and_mutate<F, Fut>(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table: &str,
    view: &str,
    filter: &str,
    limit: i64,
    mutate: F,
) -> Result<i64>
where
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = Result<i64>>,
{
    let mut page_token: Option<String> = None;
    let mut affected: i64 = 0;
    let mut attempts: u32 = 0;
    loop {
        if attempts >= MAX_LOAD_ATTEMPTS {
            return Err(Error::ExcessiveLoad(MAX_LOAD_ATTEMPTS));
        }
        attempts += 1;

        let mut page_size = DEFAULT_PAGE_SIZE;
        if limit > 0 {
            let remaining = limit - affected;
            if remaining <= 0 {
                break;
            }
            if remaining < page_size {
                page_size = remaining;
            }
        }

        let page = store
            .list_records(
                app_token,
                table,
                view,
                "",
                filter,
                "",
                page_token.as_deref(),
                page_size,
            )
            .await
            .ctx("search records")?;
        if page.items.is_empty() {
            break;
        }

        let mut ids: Vec<String> = page.items.iter().map(|r| r.record_id.clone()).collect();
        if limit > 0 {
            ids.truncate((limit - affected).max(0) as usize);
        }
        let count = mutate(ids)
            .await
            .map_err(|e| e.ctx(format!("after {affected} records affected")))?;
        affected += count;

        page_token = page.page_token;
        if !page.has_more {
            break;
        }
    }
    if affected == 0 {
        return Err(Error::NoRecordsAffected);
    }
    Ok(affected)
}

/// Resolve `(table, view)` from an object name: `schema.name` maps to
/// `(table=schema, view=name)`, an unqualified name to `(name, "")`.
fn table_and_view(name: &ObjectName) -> Result<(String, String)> {
    let parts = &name.0;
    match parts.len() {
        1 => Ok((parts[0].value.clone(), String::new())),
        2 => Ok((parts[0].value.clone(), parts[1].value.clone())),
        _ => Err(Error::TableNotFound(name.to_string())),
    }
}

fn from_table(from: &[TableWithJoins]) -> Result<(String, String)> {
    let relation = match from.first() {
        Some(table) => &table.relation,
        None => return Err(Error::TableNotFound("statement names no table".into())),
    };
    match relation {
        TableFactor::Table { name, .. } => table_and_view(name),
        other => Err(Error::TableNotFound(other.to_string())),
    }
}

/// Projected column names; `None` when the projection contains a wildcard
/// (select everything).
fn projection_names(items: &[SelectItem]) -> Option<Vec<String>> {
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => return None,
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => names.push(ident.value.clone()),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => match parts.last() {
                Some(ident) => names.push(ident.value.clone()),
                None => continue,
            },
            SelectItem::UnnamedExpr(Expr::Value(Value::SingleQuotedString(s)))
            | SelectItem::UnnamedExpr(Expr::Value(Value::DoubleQuotedString(s))) => {
                names.push(s.clone())
            }
            SelectItem::UnnamedExpr(other) => names.push(other.to_string()),
            SelectItem::ExprWithAlias { expr, .. } => names.push(expr.to_string()),
        }
    }
    Some(names)
}

fn limit_value(limit: Option<&Expr>) -> i64 {
    match limit {
        Some(Expr::Value(Value::Number(n, _))) => n.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Detect the `record_id = <literal>` point-lookup shortcut in a compiled
/// filter. Returns the remaining filter and the extracted record id.
fn extract_record_id(filter: String) -> (String, String) {
    match filter.strip_prefix(RECORD_ID_FILTER_PREFIX) {
        Some(rest) => (String::new(), rest.trim_matches('"').to_string()),
        None => (filter, String::new()),
    }
}

fn table_comment(comment: Option<&CommentDef>) -> String {
    match comment {
        Some(CommentDef::WithEq(text)) | Some(CommentDef::WithoutEq(text)) => text.clone(),
        _ => String::new(),
    }
}

fn column_comment(options: &[ColumnOptionDef]) -> String {
    options
        .iter()
        .find_map(|def| match &def.option {
            ColumnOption::Comment(comment) => Some(comment.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn property_json(field: &Field) -> String {
    match &field.property {
        Some(property) => one_line(property),
        None => String::new(),
    }
}

/// Resolve a field by name via the field listing (the backend has no lookup
/// by name).
async fn find_field(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table: &str,
    field_name: &str,
) -> Result<Field> {
    let page = store
        .list_fields(app_token, table, "", None, 100)
        .await
        .ctx("list fields")?;
    page.items
        .into_iter()
        .find(|field| field.field_name == field_name)
        .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))
}

/// Paginate the full field listing into a name-keyed map for output typing.
async fn load_fields(
    store: &Arc<dyn TableStore>,
    app_token: &str,
    table: &str,
) -> Result<HashMap<String, Field>> {
    let mut fields = HashMap::new();
    let mut page_token: Option<String> = None;
    for _ in 0..MAX_LOAD_ATTEMPTS {
        let page = store
            .list_fields(app_token, table, "", page_token.as_deref(), DEFAULT_PAGE_SIZE)
            .await
            .ctx(format!("list fields of {table}"))?;
        let has_more = page.has_more;
        page_token = page.page_token.clone();
        for field in page.items {
            fields.insert(field.field_name.clone(), field);
        }
        if !has_more {
            return Ok(fields);
        }
    }
    Err(Error::ExcessiveLoad(MAX_LOAD_ATTEMPTS))
}

/// Column-name qualifier selecting structured decoding of an INSERT value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKey {
    Persons,
    Url,
    Options,
    Attachments,
}

/// Split `qualifier.column` written inside one identifier. Only the known
/// qualifiers split; any other dotted name stays whole.
fn split_qualifier(raw: &str) -> (Option<RecordKey>, String) {
    if let Some((prefix, rest)) = raw.split_once('.') {
        let key = match prefix.to_ascii_lowercase().as_str() {
            "persons" => Some(RecordKey::Persons),
            "url" => Some(RecordKey::Url),
            "options" => Some(RecordKey::Options),
            "attachments" => Some(RecordKey::Attachments),
            _ => None,
        };
        if key.is_some() && !rest.is_empty() {
            return (key, rest.to_string());
        }
    }
    (None, raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualifier() {
        assert_eq!(
            split_qualifier("persons.人员"),
            (Some(RecordKey::Persons), "人员".to_string())
        );
        assert_eq!(
            split_qualifier("URL.主页"),
            (Some(RecordKey::Url), "主页".to_string())
        );
        assert_eq!(split_qualifier("v1.2"), (None, "v1.2".to_string()));
        assert_eq!(split_qualifier("plain"), (None, "plain".to_string()));
    }

    #[test]
    fn test_extract_record_id() {
        let (filter, id) = extract_record_id("CurrentValue.[record_id] = \"rec123\"".into());
        assert_eq!(filter, "");
        assert_eq!(id, "rec123");

        let (filter, id) = extract_record_id("CurrentValue.[record_id] = 123".into());
        assert_eq!(filter, "");
        assert_eq!(id, "123");

        let (filter, id) =
            extract_record_id("AND(CurrentValue.[record_id] = \"r\",CurrentValue.[a] = 1)".into());
        assert_eq!(id, "");
        assert!(filter.starts_with("AND("));
    }

    #[test]
    fn test_table_and_view_resolution() {
        let name = ObjectName(vec![sqlparser::ast::Ident::new("tbl")]);
        assert_eq!(
            table_and_view(&name).unwrap(),
            ("tbl".to_string(), String::new())
        );

        let name = ObjectName(vec![
            sqlparser::ast::Ident::new("tbl"),
            sqlparser::ast::Ident::new("view1"),
        ]);
        assert_eq!(
            table_and_view(&name).unwrap(),
            ("tbl".to_string(), "view1".to_string())
        );
    }

    #[test]
    fn test_insert_value_literals() {
        let mut ctx = StatementContext::default();
        let int = Expr::Value(Value::Number("42".into(), false));
        assert_eq!(insert_value(&int, None, &mut ctx).unwrap(), json!(42));

        let float = Expr::Value(Value::Number("1.25".into(), false));
        assert_eq!(insert_value(&float, None, &mut ctx).unwrap(), json!(1.25));

        let text = Expr::Value(Value::SingleQuotedString("hi".into()));
        assert_eq!(insert_value(&text, None, &mut ctx).unwrap(), json!("hi"));

        let null = Expr::Value(Value::Null);
        assert!(insert_value(&null, None, &mut ctx).is_err());
    }

    #[test]
    fn test_insert_value_persons_qualifier() {
        let mut ctx = StatementContext::default();
        let payload = Expr::Value(Value::SingleQuotedString(r#"[{"id":"u1"}]"#.into()));
        let decoded = insert_value(&payload, Some(&RecordKey::Persons), &mut ctx).unwrap();
        assert_eq!(decoded, json!([{"id": "u1"}]));

        let bad = Expr::Value(Value::SingleQuotedString("not json".into()));
        assert!(insert_value(&bad, Some(&RecordKey::Persons), &mut ctx).is_err());
    }
}
