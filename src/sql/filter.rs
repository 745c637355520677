//! Lowering of SQL expression trees into the backend's formula language.
//!
//! The formula DSL has prefix boolean calls (`AND(a,b)`), infix comparisons,
//! a `CurrentValue.[column]` row accessor and no NULL: the empty string is
//! the absence sentinel. Translation is a single recursive descent producing
//! text directly; it is deterministic and performs no backend calls.

use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, OrderByExpr,
    UnaryOperator, Value,
};

use crate::error::{Error, Result};
use crate::rows::one_line;
use crate::sql::context::StatementContext;

/// Translate an optional WHERE expression into a filter formula. `None`
/// yields the empty string (no filter), as does a clause that elides down to
/// a bare NULL; the sentinel never escapes this boundary.
pub fn translate_filter(node: Option<&Expr>, ctx: &mut StatementContext) -> Result<String> {
    match node {
        Some(expr) => match translate_expr(expr, ctx) {
            Err(Error::NullValue) => Ok(String::new()),
            other => other,
        },
        None => Ok(String::new()),
    }
}

fn translate_expr(expr: &Expr, ctx: &mut StatementContext) -> Result<String> {
    match expr {
        Expr::BinaryOp { left, op, right } => translate_binary(left, op, right, ctx),
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr,
        } => Ok(format!("NOT({})", translate_expr(expr, ctx)?)),
        Expr::Nested(inner) => translate_expr(inner, ctx),
        Expr::Identifier(ident) => Ok(format!("CurrentValue.[{}]", ident.value)),
        Expr::CompoundIdentifier(parts) => match parts.last() {
            Some(ident) => Ok(format!("CurrentValue.[{}]", ident.value)),
            None => Err(unsupported(expr)),
        },
        Expr::Value(value) => translate_value(value, ctx),
        Expr::IsNull(inner) => Ok(format!("{}=\"\"", translate_expr(inner, ctx)?)),
        Expr::IsNotNull(inner) => Ok(format!("Not({}=\"\")", translate_expr(inner, ctx)?)),
        Expr::InList {
            expr: target,
            list,
            negated,
        } => {
            let target = translate_expr(target, ctx)?;
            let items = list
                .iter()
                .map(|item| translate_expr(item, ctx))
                .collect::<Result<Vec<_>>>()?;
            let contains = format!("{}.contains({})", target, items.join(","));
            if *negated {
                Ok(format!("NOT({contains})"))
            } else {
                Ok(contains)
            }
        }
        Expr::Function(function) => translate_function(function, ctx),
        other => Err(unsupported(other)),
    }
}

fn translate_binary(
    left: &Expr,
    op: &BinaryOperator,
    right: &Expr,
    ctx: &mut StatementContext,
) -> Result<String> {
    match op {
        // Prefix boolean calls. A literal NULL on either side is elided,
        // leaving the other side's formula alone.
        BinaryOperator::And | BinaryOperator::Or => {
            let name = if matches!(op, BinaryOperator::And) {
                "AND"
            } else {
                "OR"
            };
            let l = translate_expr(left, ctx);
            let r = translate_expr(right, ctx);
            match (l, r) {
                (Ok(l), Ok(r)) => Ok(format!("{name}({l},{r})")),
                (Err(Error::NullValue), Ok(r)) => Ok(r),
                (Ok(l), Err(Error::NullValue)) => Ok(l),
                (Err(e), _) | (_, Err(e)) => Err(e),
            }
        }
        BinaryOperator::Gt
        | BinaryOperator::Lt
        | BinaryOperator::GtEq
        | BinaryOperator::LtEq
        | BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo
        | BinaryOperator::BitwiseAnd
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::PGBitwiseShiftLeft
        | BinaryOperator::PGBitwiseShiftRight => {
            let l = translate_expr(left, ctx)?;
            let r = translate_expr(right, ctx)?;
            Ok(format!("{l} {op} {r}"))
        }
        // URL-encoded to avoid ambiguity with string concatenation in the
        // transport.
        BinaryOperator::Plus => {
            let l = translate_expr(left, ctx)?;
            let r = translate_expr(right, ctx)?;
            Ok(format!("{l}%2B{r}"))
        }
        other => Err(Error::UnsupportedExpression(format!("operator {other}"))),
    }
}

fn translate_value(value: &Value, ctx: &mut StatementContext) -> Result<String> {
    match value {
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Ok(format!("\"{s}\"")),
        Value::HexStringLiteral(s) | Value::SingleQuotedByteStringLiteral(s) => {
            Ok(format!("\"{s}\""))
        }
        Value::Number(n, _) => Ok(n.clone()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Null => Err(Error::NullValue),
        Value::Placeholder(_) => match ctx.bind_next() {
            Some(param) => param.formula_literal(),
            None => Err(Error::NullValue),
        },
        other => Err(Error::UnsupportedExpression(format!("literal {other}"))),
    }
}

fn translate_function(function: &Function, ctx: &mut StatementContext) -> Result<String> {
    let name = function.name.to_string().to_lowercase();
    let args = function_args(function, ctx)?;
    match name.as_str() {
        "date" => {
            if args.len() != 3 {
                return Err(Error::UnsupportedExpression(
                    "DATE takes exactly three arguments".into(),
                ));
            }
            Ok(format!("DATE({}, {}, {})", args[0], args[1], args[2]))
        }
        "day" | "month" | "year" | "todate" => {
            if args.len() != 1 {
                return Err(Error::UnsupportedExpression(format!(
                    "{} takes exactly one argument",
                    name.to_uppercase()
                )));
            }
            Ok(format!("{}({})", name.to_uppercase(), args[0]))
        }
        "today" => Ok("TODAY()".to_string()),
        "weekday" => {
            if args.len() != 2 {
                return Err(Error::UnsupportedExpression(
                    "WEEKDAY takes exactly two arguments".into(),
                ));
            }
            Ok(format!("WEEKDAY({}, {})", args[0], args[1]))
        }
        other => Err(Error::UnsupportedExpression(format!("function {other}"))),
    }
}

fn function_args(function: &Function, ctx: &mut StatementContext) -> Result<Vec<String>> {
    let list = match &function.args {
        FunctionArguments::List(list) => &list.args,
        FunctionArguments::None => return Ok(Vec::new()),
        FunctionArguments::Subquery(_) => {
            return Err(Error::UnsupportedExpression("subquery argument".into()))
        }
    };
    list.iter()
        .map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => translate_expr(e, ctx),
            other => Err(Error::UnsupportedExpression(format!("argument {other}"))),
        })
        .collect()
}

fn unsupported(expr: &Expr) -> Error {
    Error::UnsupportedExpression(expr.to_string())
}

/// Render ORDER BY items into the backend sort string: a compact JSON array
/// of `"<column> ASC|DESC"` fragments. Empty and quoted-empty column names
/// are skipped; an empty result is the empty string.
pub fn translate_sort(items: &[OrderByExpr]) -> String {
    let mut fragments = Vec::with_capacity(items.len());
    for item in items {
        let name = match &item.expr {
            Expr::Identifier(ident) => ident.value.clone(),
            Expr::CompoundIdentifier(parts) => match parts.last() {
                Some(ident) => ident.value.clone(),
                None => continue,
            },
            _ => continue,
        };
        if name.is_empty() || name == "\"\"" {
            continue;
        }
        let direction = if item.asc == Some(false) { "DESC" } else { "ASC" };
        fragments.push(format!("{name} {direction}"));
    }
    if fragments.is_empty() {
        return String::new();
    }
    one_line(&fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn where_expr(condition: &str) -> Expr {
        let sql = format!("SELECT * FROM t WHERE {condition}");
        let statements = Parser::parse_sql(&MySqlDialect {}, &sql).unwrap();
        match statements.into_iter().next().unwrap() {
            sqlparser::ast::Statement::Query(q) => match *q.body {
                sqlparser::ast::SetExpr::Select(select) => select.selection.unwrap(),
                other => panic!("unexpected body {other}"),
            },
            other => panic!("unexpected statement {other}"),
        }
    }

    fn translate(condition: &str) -> Result<String> {
        let mut ctx = StatementContext::default();
        translate_expr(&where_expr(condition), &mut ctx)
    }

    fn order_by(sql: &str) -> Vec<OrderByExpr> {
        let statements = Parser::parse_sql(&MySqlDialect {}, sql).unwrap();
        match statements.into_iter().next().unwrap() {
            sqlparser::ast::Statement::Query(q) => {
                q.order_by.map(|ob| ob.exprs).unwrap_or_default()
            }
            other => panic!("unexpected statement {other}"),
        }
    }

    #[test]
    fn test_comparison_renders_infix() {
        assert_eq!(translate("`数字` >= 2").unwrap(), "CurrentValue.[数字] >= 2");
        assert_eq!(translate("a <> 'x'").unwrap(), "CurrentValue.[a] <> \"x\"");
        assert_eq!(translate("a < 1").unwrap(), "CurrentValue.[a] < 1");
        assert_eq!(translate("a % 2").unwrap(), "CurrentValue.[a] % 2");
    }

    #[test]
    fn test_and_or_render_prefix_calls() {
        assert_eq!(
            translate("a = 1 AND b = 2").unwrap(),
            "AND(CurrentValue.[a] = 1,CurrentValue.[b] = 2)"
        );
        assert_eq!(
            translate("a = 1 OR b = 2").unwrap(),
            "OR(CurrentValue.[a] = 1,CurrentValue.[b] = 2)"
        );
    }

    #[test]
    fn test_not_renders_prefix_call() {
        assert_eq!(translate("NOT a = 1").unwrap(), "NOT(CurrentValue.[a] = 1)");
    }

    #[test]
    fn test_plus_is_url_encoded() {
        assert_eq!(translate("a + 1 = 2").unwrap(), "CurrentValue.[a]%2B1 = 2");
    }

    #[test]
    fn test_is_null_uses_empty_string_sentinel() {
        assert_eq!(translate("`单选` IS NULL").unwrap(), "CurrentValue.[单选]=\"\"");
        assert_eq!(
            translate("`单选` IS NOT NULL").unwrap(),
            "Not(CurrentValue.[单选]=\"\")"
        );
    }

    #[test]
    fn test_in_list_renders_contains() {
        assert_eq!(
            translate("`数字` IN (3, 1)").unwrap(),
            "CurrentValue.[数字].contains(3,1)"
        );
        assert_eq!(
            translate("tag IN ('a', 'b')").unwrap(),
            "CurrentValue.[tag].contains(\"a\",\"b\")"
        );
        assert_eq!(
            translate("tag NOT IN ('a')").unwrap(),
            "NOT(CurrentValue.[tag].contains(\"a\"))"
        );
    }

    #[test]
    fn test_null_elision_in_and_or() {
        assert_eq!(translate("a = 1 AND NULL").unwrap(), "CurrentValue.[a] = 1");
        assert_eq!(translate("NULL OR b = 2").unwrap(), "CurrentValue.[b] = 2");
    }

    #[test]
    fn test_bare_null_raises_sentinel() {
        assert!(matches!(translate("NULL"), Err(Error::NullValue)));
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            translate("`日期` >= TODATE('2021-12-16')").unwrap(),
            "CurrentValue.[日期] >= TODATE(\"2021-12-16\")"
        );
        assert_eq!(translate("d = TODAY()").unwrap(), "CurrentValue.[d] = TODAY()");
        assert_eq!(
            translate("DATE(2021, 12, 16) = d").unwrap(),
            "DATE(2021, 12, 16) = CurrentValue.[d]"
        );
        assert_eq!(
            translate("WEEKDAY(d, 1) = 2").unwrap(),
            "WEEKDAY(CurrentValue.[d], 1) = 2"
        );
    }

    #[test]
    fn test_function_arity_is_validated() {
        assert!(translate("TODATE('a', 'b') = 1").is_err());
        assert!(translate("WEEKDAY(d) = 1").is_err());
    }

    #[test]
    fn test_unsupported_expressions_fail() {
        assert!(matches!(
            translate("a LIKE 'x%'"),
            Err(Error::UnsupportedExpression(_))
        ));
        assert!(matches!(
            translate("a <=> 1"),
            Err(Error::UnsupportedExpression(_))
        ));
        assert!(matches!(
            translate("a XOR b"),
            Err(Error::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn test_bound_parameters() {
        let expr = where_expr("a = ? AND b = ?");
        let mut ctx = StatementContext::new(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            vec![
                crate::sql::context::Param::Text("x".into()),
                crate::sql::context::Param::Int(9),
            ],
        )
        .unwrap();
        assert_eq!(
            translate_expr(&expr, &mut ctx).unwrap(),
            "AND(CurrentValue.[a] = \"x\",CurrentValue.[b] = 9)"
        );
    }

    #[test]
    fn test_sort_joins_fragments() {
        let items = order_by("SELECT * FROM t ORDER BY `数字` DESC, name");
        assert_eq!(translate_sort(&items), r#"["数字 DESC","name ASC"]"#);
    }

    #[test]
    fn test_sort_skips_unusable_columns() {
        let items = order_by("SELECT * FROM t ORDER BY LENGTH(a)");
        assert_eq!(translate_sort(&items), "");
    }
}
