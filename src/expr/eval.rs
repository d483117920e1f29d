use std::collections::BTreeMap;
use super::functions::{call_function, call_method};
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::value::Value;
use super::{Activation, ExprError};

pub fn evaluate(expr: &Expr, vars: &dyn Activation) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => vars.resolve(name).cloned().ok_or_else(|| {
            ExprError::Runtime(format!("no such attribute '{}'", name))
        }),
        Expr::List(items) => items.iter()
            .map(|e| evaluate(e, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Map(entries) => {
            let mut map = BTreeMap::new();
            for (k, v) in entries {
                let key = match evaluate(k, vars)? {
                    Value::String(s) => s,
                    other => {
                        return Err(ExprError::Runtime(format!(
                            "map keys must be strings, got {}",
                            other.type_name()
                        )))
                    }
                };
                map.insert(key, evaluate(v, vars)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Select { operand, field } => select(evaluate(operand, vars)?, field),
        Expr::Index { operand, index } => {
            let target = evaluate(operand, vars)?;
            let index = evaluate(index, vars)?;
            index_value(target, index)
        }
        Expr::Call { function, args } => {
            let args = eval_args(args, vars)?;
            call_function(function, args)
        }
        Expr::Method { receiver, method, args } => {
            let receiver = evaluate(receiver, vars)?;
            let args = eval_args(args, vars)?;
            call_method(receiver, method, args)
        }
        Expr::Unary { op, operand } => match (op, evaluate(operand, vars)?) {
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Neg, Value::Int(i)) => i.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExprError::Runtime("integer overflow".into())),
            (op, other) => Err(ExprError::Runtime(format!(
                "no matching overload for {}{}",
                if *op == UnaryOp::Not { "!" } else { "-" },
                other.type_name()
            ))),
        },
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            if !truth(evaluate(lhs, vars)?, "&&")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truth(evaluate(rhs, vars)?, "&&")?))
        }
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            if truth(evaluate(lhs, vars)?, "||")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truth(evaluate(rhs, vars)?, "||")?))
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, vars)?;
            let rhs = evaluate(rhs, vars)?;
            binary(*op, lhs, rhs)
        }
        Expr::Conditional { cond, then, otherwise } => {
            if truth(evaluate(cond, vars)?, "?:")? {
                evaluate(then, vars)
            } else {
                evaluate(otherwise, vars)
            }
        }
    }
}

fn eval_args(args: &[Expr], vars: &dyn Activation) -> Result<Vec<Value>, ExprError> {
    args.iter().map(|a| evaluate(a, vars)).collect()
}

fn truth(v: Value, op: &str) -> Result<bool, ExprError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::Runtime(format!(
            "operator {} expects bool, got {}",
            op,
            other.type_name()
        ))),
    }
}

fn select(target: Value, field: &str) -> Result<Value, ExprError> {
    let missing = |type_name: &str| {
        ExprError::Runtime(format!("no such field '{}' on {}", field, type_name))
    };
    match target {
        Value::Map(mut map) => map.remove(field)
            .ok_or_else(|| ExprError::Runtime(format!("no such key '{}'", field))),
        Value::Response(r) => match field {
            "status" => Ok(Value::Int(r.status)),
            "body" => Ok(Value::Bytes(r.body)),
            "content_type" => Ok(Value::String(r.content_type)),
            "headers" => Ok(Value::Map(
                r.headers.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
            )),
            _ => Err(missing("response")),
        },
        Value::Request(r) => match field {
            "url" => Ok(Value::Url(r.url)),
            _ => Err(missing("request")),
        },
        Value::Reverse(r) => match field {
            "url" => Ok(Value::Url(r.url.clone())),
            "domain" => Ok(Value::String(r.domain().to_string())),
            "ip" => Ok(Value::String(r.ip().to_string())),
            "port" => Ok(Value::String(r.url.port())),
            _ => Err(missing("reverse")),
        },
        Value::Url(u) => match field {
            "scheme" => Ok(Value::String(u.scheme().to_string())),
            "host" => Ok(Value::String(u.host())),
            "domain" => Ok(Value::String(u.domain().to_string())),
            "port" => Ok(Value::String(u.port())),
            "path" => Ok(Value::String(u.path().to_string())),
            "query" => Ok(Value::String(u.query().to_string())),
            "fragment" => Ok(Value::String(u.fragment().to_string())),
            _ => Err(missing("url")),
        },
        other => Err(missing(other.type_name())),
    }
}

fn index_value(target: Value, index: Value) -> Result<Value, ExprError> {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => {
            let len = items.len();
            usize::try_from(i).ok()
                .and_then(|i| items.into_iter().nth(i))
                .ok_or_else(|| ExprError::Runtime(format!("index {} out of range (len {})", i, len)))
        }
        (Value::Map(mut map), Value::String(key)) => map.remove(&key)
            .ok_or_else(|| ExprError::Runtime(format!("no such key '{}'", key))),
        (target, index) => Err(ExprError::Runtime(format!(
            "no matching overload for {}[{}]",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    use Value::*;
    let overflow = || ExprError::Runtime("integer overflow".into());
    match (op, lhs, rhs) {
        (BinaryOp::Eq, l, r) => Ok(Bool(l == r)),
        (BinaryOp::Ne, l, r) => Ok(Bool(l != r)),

        (BinaryOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(overflow),
        (BinaryOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(overflow),
        (BinaryOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(overflow),
        (BinaryOp::Div, Int(_), Int(0)) | (BinaryOp::Rem, Int(_), Int(0)) => {
            Err(ExprError::Runtime("division by zero".into()))
        }
        (BinaryOp::Div, Int(a), Int(b)) => a.checked_div(b).map(Int).ok_or_else(overflow),
        (BinaryOp::Rem, Int(a), Int(b)) => a.checked_rem(b).map(Int).ok_or_else(overflow),

        (BinaryOp::Add, String(a), String(b)) => Ok(String(a + &b)),
        (BinaryOp::Add, Bytes(mut a), Bytes(b)) => {
            a.extend_from_slice(&b);
            Ok(Bytes(a))
        }
        (BinaryOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }

        (BinaryOp::Lt, Int(a), Int(b)) => Ok(Bool(a < b)),
        (BinaryOp::Le, Int(a), Int(b)) => Ok(Bool(a <= b)),
        (BinaryOp::Gt, Int(a), Int(b)) => Ok(Bool(a > b)),
        (BinaryOp::Ge, Int(a), Int(b)) => Ok(Bool(a >= b)),
        (BinaryOp::Lt, String(a), String(b)) => Ok(Bool(a < b)),
        (BinaryOp::Le, String(a), String(b)) => Ok(Bool(a <= b)),
        (BinaryOp::Gt, String(a), String(b)) => Ok(Bool(a > b)),
        (BinaryOp::Ge, String(a), String(b)) => Ok(Bool(a >= b)),

        (BinaryOp::In, needle, List(items)) => Ok(Bool(items.contains(&needle))),
        (BinaryOp::In, String(key), Map(map)) => Ok(Bool(map.contains_key(&key))),

        (op, l, r) => Err(ExprError::Runtime(format!(
            "no matching overload for {} {} {}",
            l.type_name(),
            op.symbol(),
            r.type_name()
        ))),
    }
}
