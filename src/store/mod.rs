//! The table-store collaborator contract.
//!
//! The driver consumes a fixed set of CRUD/list operations; authentication,
//! HTTP transport and response mapping live in the implementation supplied
//! by the embedder. Transport failures are wrapped into
//! [`Error::Store`](crate::Error::Store) so the compiler can attach the
//! operation context that triggered them.

pub mod cache;
pub mod entity;

pub use cache::StoreCache;
pub use entity::{
    App, Attachment, Attachments, Field, FieldOption, FieldProperty, FieldType, Link, Options,
    Page, Person, Persons, Record, Table, View, ViewType,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;

/// Page size used whenever a listing is not otherwise constrained.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Record field payload: opaque JSON values keyed by field name.
pub type FieldValues = Map<String, Value>;

/// Remote table-store operations.
///
/// Every list-style call accepts an optional continuation token plus a page
/// size and returns a [`Page`]. Field property blobs travel as JSON strings
/// (empty string for none), matching the backend's wire shape.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_app(&self, app_token: &str) -> Result<App>;

    /// Create a table, returning its id.
    async fn create_table(&self, app_token: &str, name: &str) -> Result<String>;

    async fn drop_table(&self, app_token: &str, table_id: &str) -> Result<()>;

    async fn list_tables(
        &self,
        app_token: &str,
        page_token: Option<&str>,
        page_size: i64,
    ) -> Result<Page<Table>>;

    async fn create_view(
        &self,
        app_token: &str,
        table_id: &str,
        view_name: &str,
        view_type: &str,
    ) -> Result<View>;

    async fn drop_view(&self, app_token: &str, table_id: &str, view_id: &str) -> Result<()>;

    async fn list_views(
        &self,
        app_token: &str,
        table_id: &str,
        page_token: Option<&str>,
        page_size: i64,
    ) -> Result<Page<View>>;

    async fn add_field(
        &self,
        app_token: &str,
        table_id: &str,
        field_name: &str,
        field_type: i64,
        property: &str,
    ) -> Result<Field>;

    /// Delete a field, reporting whether the backend removed it.
    async fn delete_field(&self, app_token: &str, table_id: &str, field_id: &str) -> Result<bool>;

    async fn update_field(
        &self,
        app_token: &str,
        table_id: &str,
        field_id: &str,
        field_name: &str,
        field_type: i64,
        property: &str,
    ) -> Result<Field>;

    async fn list_fields(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: &str,
        page_token: Option<&str>,
        page_size: i64,
    ) -> Result<Page<Field>>;

    /// Batch-create records from field payloads.
    async fn insert_records(
        &self,
        app_token: &str,
        table_id: &str,
        records: &[FieldValues],
    ) -> Result<Vec<Record>>;

    /// Delete one record, reporting whether the backend removed it.
    /// The backend has no batch delete.
    async fn delete_record(&self, app_token: &str, table_id: &str, record_id: &str)
        -> Result<bool>;

    /// Batch-update records; the map is keyed by record id.
    async fn update_records(
        &self,
        app_token: &str,
        table_id: &str,
        updates: &HashMap<String, FieldValues>,
    ) -> Result<Vec<Record>>;

    async fn get_record(&self, app_token: &str, table_id: &str, record_id: &str) -> Result<Record>;

    /// Filtered, sorted, projected record listing. `field_names`, `filter`
    /// and `sort` are backend wire strings; empty means unset.
    #[allow(clippy::too_many_arguments)]
    async fn list_records(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: &str,
        field_names: &str,
        filter: &str,
        sort: &str,
        page_token: Option<&str>,
        page_size: i64,
    ) -> Result<Page<Record>>;
}
