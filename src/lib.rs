//! bsql: speak SQL against a hierarchical, REST-accessed table store.
//!
//! The backend exposes apps → tables → views → fields → records through
//! CRUD endpoints with cursor pagination and a proprietary formula language
//! for server-side filtering. This crate compiles parsed SQL statements
//! into those calls and exposes results through a pull-based cursor:
//!
//! ```text
//! SQL text
//!     ↓
//! sqlparser (MySQL dialect)
//!     ↓
//! Statement compiler        (sql/compiler.rs)
//!   filter/sort translator  (sql/filter.rs)
//!   field type mapper       (sql/fields.rs)
//!     ↓
//! TableStore trait          (store/)
//!     ↓
//! Pagination cursor         (rows/)
//! ```
//!
//! The store client itself (transport, authentication, response mapping)
//! is supplied by the embedder as a [`TableStore`] implementation.

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod rows;
pub mod sql;
pub mod store;

pub use config::Config;
pub use driver::{Connection, Driver, Statement, Transaction};
pub use error::{Error, Result};
pub use rows::{Cell, Rows};
pub use sql::context::Param;
pub use store::{StoreCache, TableStore};

/// Version string reported by `SELECT version()`.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-bitable");
