use super::functions::{function_return_type, method_return_type};
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::types::DeclType;
use super::ExprError;

/// Static pass over a parsed expression. Every identifier must be resolvable
/// and field selection must be valid for known structured types. Scalars
/// are only checked loosely; the evaluator reports remaining mismatches.
pub fn check(expr: &Expr, resolve: &dyn Fn(&str) -> Option<DeclType>) -> Result<DeclType, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(DeclType::of_value(v).unwrap_or(DeclType::Dyn)),
        Expr::Ident(name) => resolve(name)
            .ok_or_else(|| ExprError::Check(format!("undeclared reference to '{}'", name))),
        Expr::List(items) => {
            for item in items {
                check(item, resolve)?;
            }
            Ok(DeclType::List)
        }
        Expr::Map(entries) => {
            for (k, v) in entries {
                check(k, resolve)?;
                check(v, resolve)?;
            }
            Ok(DeclType::Map)
        }
        Expr::Select { operand, field } => {
            let operand = check(operand, resolve)?;
            operand.field_type(field).map_err(ExprError::Check)
        }
        Expr::Index { operand, index } => {
            check(operand, resolve)?;
            check(index, resolve)?;
            Ok(DeclType::Dyn)
        }
        Expr::Call { function, args } => {
            for arg in args {
                check(arg, resolve)?;
            }
            function_return_type(function).ok_or_else(|| {
                ExprError::Check(format!("undeclared reference to function '{}'", function))
            })
        }
        Expr::Method { receiver, method, args } => {
            let receiver = check(receiver, resolve)?;
            for arg in args {
                check(arg, resolve)?;
            }
            let ret = method_return_type(method).ok_or_else(|| {
                ExprError::Check(format!("undeclared reference to method '{}'", method))
            })?;
            Ok(match (method.as_str(), receiver) {
                ("concat", t @ (DeclType::String | DeclType::Bytes)) => t,
                _ => ret,
            })
        }
        Expr::Unary { op, operand } => {
            check(operand, resolve)?;
            Ok(match op {
                UnaryOp::Not => DeclType::Bool,
                UnaryOp::Neg => DeclType::Int,
            })
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = check(lhs, resolve)?;
            let r = check(rhs, resolve)?;
            Ok(match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                    if l == r { l } else { DeclType::Dyn }
                }
                _ => DeclType::Bool,
            })
        }
        Expr::Conditional { cond, then, otherwise } => {
            check(cond, resolve)?;
            let t = check(then, resolve)?;
            let o = check(otherwise, resolve)?;
            Ok(if t == o { t } else { DeclType::Dyn })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    fn declared(name: &str) -> Option<DeclType> {
        match name {
            "response" => Some(DeclType::Response),
            "request" => Some(DeclType::Request),
            "token" => Some(DeclType::String),
            _ => None,
        }
    }

    fn check_src(source: &str) -> Result<DeclType, ExprError> {
        check(&parse(source).unwrap(), &declared)
    }

    #[test]
    fn test_valid_rule_expression() {
        assert_eq!(
            check_src("response.status == 200 && response.body.bcontains(bytes(token))").unwrap(),
            DeclType::Bool
        );
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = check_src("missing == 1").unwrap_err();
        assert!(matches!(err, ExprError::Check(ref m) if m.contains("'missing'")));
    }

    #[test]
    fn test_unknown_field_on_response() {
        assert!(check_src("response.cookies").is_err());
    }

    #[test]
    fn test_field_on_scalar_rejected() {
        assert!(check_src("token.length").is_err());
    }

    #[test]
    fn test_unknown_function_rejected() {
        assert!(check_src("md4(token)").is_err());
    }

    #[test]
    fn test_url_selection_type() {
        assert_eq!(check_src("request.url").unwrap(), DeclType::Url);
        assert_eq!(check_src("request.url.host").unwrap(), DeclType::String);
    }
}
