//! Error handling for the bsql driver.
//!
//! All public APIs return [`Result<T>`]. Backend implementations wrap their
//! transport failures into [`Error::Store`]; the compiler attaches the
//! operation that triggered a failure via [`ResultExt::ctx`] before the error
//! reaches the caller.

use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the driver.
#[derive(Debug, Error)]
pub enum Error {
    /// The SQL text could not be parsed.
    #[error("sql parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    /// The statement parsed but its kind is outside the supported surface.
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    /// An expression node has no rendering in the backend formula language.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// No table name could be resolved from the statement.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A referenced column does not exist on the target table.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// The application token does not resolve to a database.
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    /// Internal sentinel for a literal NULL inside a filter expression.
    /// Consumed by the AND/OR and bound-parameter handlers; never returned
    /// to callers as-is.
    #[error("null value")]
    NullValue,

    /// An INSERT row produced no fields after filtering pseudo-columns.
    #[error("insert produced no record fields")]
    EmptyInsert,

    /// A WHERE-qualified UPDATE/DELETE matched nothing.
    #[error("no records affected")]
    NoRecordsAffected,

    /// The pagination or batch-mutation loop exceeded its fetch ceiling
    /// without the backend signaling exhaustion.
    #[error("page load ceiling exceeded after {0} attempts")]
    ExcessiveLoad(u32),

    /// The query text contains more placeholders than bound arguments.
    #[error("query has {expected} placeholders but {got} arguments were bound")]
    ParamCount { expected: usize, got: usize },

    /// The connection string is malformed.
    #[error("invalid dsn: {0}")]
    Dsn(String),

    /// Statement execution exceeded the connection timeout.
    #[error("statement timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Connections are pooled and reused; tearing one down is not supported.
    #[error("connection close is not supported")]
    CloseUnsupported,

    /// A statement operation failed against the backend.
    #[error("{op}: {source}")]
    Op {
        op: String,
        #[source]
        source: Box<Error>,
    },

    /// A backend transport failure, wrapped by the store implementation.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl Error {
    /// Wrap this error with the operation that triggered it.
    pub fn ctx(self, op: impl Into<String>) -> Error {
        Error::Op {
            op: op.into(),
            source: Box::new(self),
        }
    }
}

/// Attaches operation context to driver errors, mirroring the
/// `anyhow::Context` idiom for the typed taxonomy.
pub trait ResultExt<T> {
    fn ctx(self, op: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn ctx(self, op: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.ctx(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_wraps_operation() {
        let err: Result<()> = Err(Error::TableNotFound("t1".into()));
        let wrapped = err.ctx("drop table").unwrap_err();
        assert_eq!(wrapped.to_string(), "drop table: table not found: t1");
    }

    #[test]
    fn test_store_error_from_anyhow() {
        let err = Error::from(anyhow::anyhow!("connection reset"));
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
