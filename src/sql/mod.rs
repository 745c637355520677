//! SQL statement compilation: AST dispatch, filter/sort lowering, field
//! type mapping and bound-parameter context.

pub mod compiler;
pub mod context;
pub mod fields;
pub mod filter;

pub use compiler::execute;
pub use context::{Param, StatementContext};
pub use fields::{output_cell, sql_type_to_field_type};
pub use filter::{translate_filter, translate_sort};
