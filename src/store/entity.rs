//! Domain objects exchanged with the table store.
//!
//! The backend is hierarchical: an app (database) holds tables, a table
//! holds views, fields and records. Record field values are opaque JSON
//! keyed by field name; their interpretation is driven by the stored field
//! type, never re-derived from SQL.

use serde::{Deserialize, Serialize};

/// Application (database) metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub app_token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

/// View metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub view_id: String,
    #[serde(default)]
    pub view_name: String,
    #[serde(default)]
    pub view_type: String,
}

/// Field (column) metadata. `field_type` is the backend's numeric type code;
/// see [`FieldType`] for the known codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(rename = "type", default)]
    pub field_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<FieldProperty>,
}

/// Per-field property blob. Different field types populate different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub formatter: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_format: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_fill: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub view_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

/// Select/multi-select option.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// One row of a table. Field values stay as raw JSON until projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// One fetch's worth of a listing: items plus continuation state.
/// `page_token` is present whenever `has_more` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default)]
    pub total: i64,
}

impl<T> Page<T> {
    /// A terminal page holding the given items.
    pub fn of(items: Vec<T>) -> Page<T> {
        let total = items.len() as i64;
        Page {
            items,
            has_more: false,
            page_token: None,
            total,
        }
    }

    /// A terminal empty page.
    pub fn empty() -> Page<T> {
        Page::of(Vec::new())
    }
}

/// The backend's field type enumeration. Unknown codes survive as
/// [`FieldType::Other`] so metadata round-trips losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    SingleSelect,
    MultiSelect,
    Date,
    Checkbox,
    Person,
    Link,
    Attachment,
    OneWayLink,
    Lookup,
    Formula,
    TwoWayLink,
    CreatedTime,
    ModifiedTime,
    CreatedBy,
    ModifiedBy,
    Other(i64),
}

impl FieldType {
    pub fn from_code(code: i64) -> FieldType {
        match code {
            1 => FieldType::Text,
            2 => FieldType::Number,
            3 => FieldType::SingleSelect,
            4 => FieldType::MultiSelect,
            5 => FieldType::Date,
            7 => FieldType::Checkbox,
            11 => FieldType::Person,
            15 => FieldType::Link,
            17 => FieldType::Attachment,
            18 => FieldType::OneWayLink,
            19 => FieldType::Lookup,
            20 => FieldType::Formula,
            21 => FieldType::TwoWayLink,
            1001 => FieldType::CreatedTime,
            1002 => FieldType::ModifiedTime,
            1003 => FieldType::CreatedBy,
            1004 => FieldType::ModifiedBy,
            other => FieldType::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            FieldType::Text => 1,
            FieldType::Number => 2,
            FieldType::SingleSelect => 3,
            FieldType::MultiSelect => 4,
            FieldType::Date => 5,
            FieldType::Checkbox => 7,
            FieldType::Person => 11,
            FieldType::Link => 15,
            FieldType::Attachment => 17,
            FieldType::OneWayLink => 18,
            FieldType::Lookup => 19,
            FieldType::Formula => 20,
            FieldType::TwoWayLink => 21,
            FieldType::CreatedTime => 1001,
            FieldType::ModifiedTime => 1002,
            FieldType::CreatedBy => 1003,
            FieldType::ModifiedBy => 1004,
            FieldType::Other(code) => code,
        }
    }
}

/// View kinds accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Grid,
    Kanban,
    Gantt,
    Gallery,
    Form,
}

impl ViewType {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewType::Grid => "grid",
            ViewType::Kanban => "kanban",
            ViewType::Gantt => "gantt",
            ViewType::Gallery => "gallery",
            ViewType::Form => "form",
        }
    }
}

/// Person reference for a person-typed field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub en_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Hyperlink value for a link-typed field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
}

/// Attachment reference for an attachment-typed field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tmp_url: String,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Structured INSERT payloads selected by a column-name qualifier.
pub type Persons = Vec<Person>;
pub type Attachments = Vec<Attachment>;
pub type Options = Vec<String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip() {
        for code in [1, 2, 3, 4, 5, 7, 11, 15, 17, 18, 19, 20, 21, 1001, 1002, 1003, 1004, 42] {
            assert_eq!(FieldType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_field_deserializes_backend_shape() {
        let raw = r#"{"field_id":"fld1","field_name":"标题","type":1,"property":null}"#;
        let field: Field = serde_json::from_str(raw).unwrap();
        assert_eq!(field.field_name, "标题");
        assert_eq!(FieldType::from_code(field.field_type), FieldType::Text);
    }

    #[test]
    fn test_property_renders_compact() {
        let property = FieldProperty {
            options: vec![FieldOption {
                name: "开发".into(),
                id: "opt1".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&property).unwrap(),
            r#"{"options":[{"name":"开发","id":"opt1"}]}"#
        );
    }

    #[test]
    fn test_page_of_is_terminal() {
        let page = Page::of(vec![1, 2, 3]);
        assert!(!page.has_more);
        assert_eq!(page.total, 3);
        assert!(page.page_token.is_none());
    }
}
