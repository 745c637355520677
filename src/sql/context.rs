//! Per-execute statement context: the bound-parameter map.
//!
//! Placeholders are positional `?` markers. The raw query text is scanned
//! once and the markers are zipped against the caller's argument list in
//! order; translation then consumes them sequentially, which matches textual
//! order for the supported statement surface (UPDATE consumes its SET list
//! before its WHERE clause).

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl Param {
    /// Render for direct embedding into a filter formula. Strings are
    /// quoted; everything else is stringified.
    pub fn formula_literal(&self) -> Result<String> {
        match self {
            Param::Null => Err(Error::NullValue),
            Param::Bool(b) => Ok(b.to_string()),
            Param::Int(i) => Ok(i.to_string()),
            Param::Float(f) => Ok(f.to_string()),
            Param::Text(s) => Ok(format!("\"{s}\"")),
            Param::Bytes(b) => Ok(format!("\"{}\"", String::from_utf8_lossy(b))),
            Param::Timestamp(ts) => Ok(ts.timestamp_millis().to_string()),
        }
    }
}

/// Placeholder bindings for one `execute` call. Created per call and
/// discarded when it returns.
#[derive(Debug, Default)]
pub struct StatementContext {
    args: Vec<Param>,
    seek: usize,
}

impl StatementContext {
    /// Scan `query` for `?` markers and zip them against `args`. Fewer
    /// arguments than markers is an error; surplus arguments are ignored.
    pub fn new(query: &str, args: Vec<Param>) -> Result<StatementContext> {
        let expected = query.chars().filter(|c| *c == '?').count();
        if args.len() < expected {
            return Err(Error::ParamCount {
                expected,
                got: args.len(),
            });
        }
        Ok(StatementContext { args, seek: 0 })
    }

    /// Whether any parameters were bound at all.
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }

    /// Consume the next positional binding.
    pub fn bind_next(&mut self) -> Option<&Param> {
        let param = self.args.get(self.seek);
        if param.is_some() {
            self.seek += 1;
        }
        param
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_in_order() {
        let mut ctx = StatementContext::new(
            "UPDATE t SET a = ? WHERE b = ?",
            vec![Param::Int(1), Param::Text("x".into())],
        )
        .unwrap();
        assert_eq!(ctx.bind_next(), Some(&Param::Int(1)));
        assert_eq!(ctx.bind_next(), Some(&Param::Text("x".into())));
        assert_eq!(ctx.bind_next(), None);
    }

    #[test]
    fn test_too_few_args() {
        let err = StatementContext::new("SELECT * FROM t WHERE a = ? AND b = ?", vec![]).unwrap_err();
        assert!(matches!(
            err,
            Error::ParamCount {
                expected: 2,
                got: 0
            }
        ));
    }

    #[test]
    fn test_formula_literal_quoting() {
        assert_eq!(Param::Text("张三".into()).formula_literal().unwrap(), "\"张三\"");
        assert_eq!(Param::Int(3).formula_literal().unwrap(), "3");
        assert_eq!(Param::Float(1.5).formula_literal().unwrap(), "1.5");
        assert!(matches!(
            Param::Null.formula_literal(),
            Err(Error::NullValue)
        ));
    }
}
