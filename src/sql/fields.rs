//! Mapping between declared SQL column types and the backend's field-type
//! codes, plus stored-type-driven output coercion.
//!
//! The mapping runs one way only: reads never re-derive SQL types. Once a
//! field exists, the backend's stored type drives how its values are
//! projected into cells.

use chrono::{TimeZone, Utc};
use serde_json::Value;
use sqlparser::ast::{CharacterLength, DataType};

use crate::rows::{one_line, Cell};
use crate::store::FieldType;

/// Map a declared SQL column type to a backend field-type code.
///
/// `VARCHAR(n)` reinterprets `n` itself as the type code, so callers can
/// request any backend type directly (`varchar(7)` asks for a checkbox).
/// Unmapped types return 0, which ALTER treats as "keep the current type".
pub fn sql_type_to_field_type(data_type: &DataType) -> i64 {
    match data_type {
        DataType::Text | DataType::Blob(_) | DataType::TinyInt(_) => FieldType::Text.code(),
        DataType::Int(_)
        | DataType::Integer(_)
        | DataType::SmallInt(_)
        | DataType::MediumInt(_)
        | DataType::BigInt(_)
        | DataType::Decimal(_)
        | DataType::Numeric(_)
        | DataType::Float(_)
        | DataType::Double
        | DataType::DoublePrecision
        | DataType::Real => FieldType::Number.code(),
        DataType::Varchar(len) | DataType::CharacterVarying(len) => match len {
            Some(CharacterLength::IntegerLength { length, .. }) if *length > 0 => *length as i64,
            _ => FieldType::Text.code(),
        },
        _ => 0,
    }
}

/// Project one stored field value into a typed cell, driven by the field's
/// stored type code.
pub fn output_cell(field_type: i64, value: Option<&Value>) -> Cell {
    match FieldType::from_code(field_type) {
        FieldType::Text | FieldType::SingleSelect => match value {
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(other) => Cell::Json(one_line(other)),
            None => Cell::Null,
        },
        FieldType::Number => match value {
            Some(Value::String(s)) => Cell::Float(s.parse::<f64>().unwrap_or(0.0)),
            Some(Value::Number(n)) => Cell::Float(n.as_f64().unwrap_or(0.0)),
            _ => Cell::Float(0.0),
        },
        FieldType::Checkbox => match value {
            Some(Value::Bool(b)) => Cell::Bool(*b),
            _ => Cell::Bool(false),
        },
        FieldType::Link | FieldType::Person | FieldType::Attachment | FieldType::MultiSelect => {
            match value {
                Some(v) => Cell::Json(one_line(v)),
                None => Cell::Null,
            }
        }
        FieldType::Date | FieldType::CreatedTime | FieldType::ModifiedTime => match value {
            Some(v) => match v.as_f64() {
                // millisecond epoch, truncated to whole seconds
                Some(ms) => Cell::Timestamp(
                    Utc.timestamp_opt((ms / 1e3) as i64, 0)
                        .single()
                        .unwrap_or_default(),
                ),
                None => Cell::Null,
            },
            None => Cell::Null,
        },
        _ => match value {
            Some(v) => Cell::Json(one_line(v)),
            None => Cell::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn declared_type(sql_type: &str) -> DataType {
        let sql = format!("CREATE TABLE t (c {sql_type})");
        let statements = Parser::parse_sql(&MySqlDialect {}, &sql).unwrap();
        match statements.into_iter().next().unwrap() {
            sqlparser::ast::Statement::CreateTable(create) => {
                create.columns.into_iter().next().unwrap().data_type
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_text_family_maps_to_text() {
        for t in ["TEXT", "BLOB", "TINYINT"] {
            assert_eq!(sql_type_to_field_type(&declared_type(t)), 1, "{t}");
        }
    }

    #[test]
    fn test_number_family_maps_to_number() {
        for t in ["INT", "BIGINT", "SMALLINT", "DECIMAL(10,2)", "FLOAT", "DOUBLE"] {
            assert_eq!(sql_type_to_field_type(&declared_type(t)), 2, "{t}");
        }
    }

    #[test]
    fn test_varchar_passes_length_through_as_code() {
        assert_eq!(sql_type_to_field_type(&declared_type("VARCHAR(7)")), 7);
        assert_eq!(sql_type_to_field_type(&declared_type("VARCHAR(1001)")), 1001);
        assert_eq!(sql_type_to_field_type(&declared_type("VARCHAR")), 1);
    }

    #[test]
    fn test_unmapped_type_is_zero() {
        assert_eq!(sql_type_to_field_type(&declared_type("DATE")), 0);
    }

    #[test]
    fn test_output_text_passthrough() {
        let v = serde_json::json!("hello");
        assert_eq!(output_cell(1, Some(&v)), Cell::Text("hello".into()));
        assert_eq!(output_cell(3, Some(&v)), Cell::Text("hello".into()));
    }

    #[test]
    fn test_output_number_parses_stored_string() {
        let v = serde_json::json!("12.5");
        assert_eq!(output_cell(2, Some(&v)), Cell::Float(12.5));
        assert_eq!(output_cell(2, None), Cell::Float(0.0));
        let bad = serde_json::json!("abc");
        assert_eq!(output_cell(2, Some(&bad)), Cell::Float(0.0));
    }

    #[test]
    fn test_output_checkbox() {
        let v = serde_json::json!(true);
        assert_eq!(output_cell(7, Some(&v)), Cell::Bool(true));
        assert_eq!(output_cell(7, None), Cell::Bool(false));
    }

    #[test]
    fn test_output_structured_serializes_compact() {
        let v = serde_json::json!([{"id": "u1"}]);
        assert_eq!(output_cell(11, Some(&v)), Cell::Json(r#"[{"id":"u1"}]"#.into()));
    }

    #[test]
    fn test_output_date_divides_millis() {
        let v = serde_json::json!(1_639_584_000_000_i64);
        let cell = output_cell(5, Some(&v));
        match cell {
            Cell::Timestamp(ts) => assert_eq!(ts.timestamp(), 1_639_584_000),
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_output_unknown_type_falls_back_to_json() {
        let v = serde_json::json!({"k": 1});
        assert_eq!(output_cell(20, Some(&v)), Cell::Json(r#"{"k":1}"#.into()));
    }
}
