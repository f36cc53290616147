use crate::{BinaryOpType, Error, Expr, Result, UnaryOpType, Value};
use std::collections::HashMap;

/// Values captured for one execution: external binder parameters by name.
///
/// Replaces host-language closure state with an explicit environment so
/// evaluating a local is plain interpretation, never generated code.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    params: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// Evaluate a `Local`-classified expression against the environment.
///
/// Handles the node shapes the analyzer can classify as locals; anything
/// data-dependent reaching this point is a caller bug and reports as an
/// evaluation error.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Parameter(param) => env
            .get(&param.name)
            .cloned()
            .ok_or_else(|| Error::Evaluation(format!("parameter {} is not bound", param.name))),
        Expr::Unary { op, arg } => {
            let value = evaluate(arg, env)?;
            unary(*op, value)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, env)?;
            let rhs = evaluate(rhs, env)?;
            binary(*op, lhs, rhs)
        }
        Expr::Conditional {
            condition,
            then_value,
            else_value,
        } => match evaluate(condition, env)? {
            Value::Boolean(Some(true)) => evaluate(then_value, env),
            Value::Boolean(Some(false)) | Value::Boolean(None) => evaluate(else_value, env),
            other => Err(Error::Evaluation(format!(
                "conditional guard evaluated to {} instead of a boolean",
                other.type_name()
            ))),
        },
        Expr::Collection(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, env))
                .collect::<Result<Vec<_>>>()?;
            let prototype = values.first().cloned().unwrap_or(Value::Null);
            Ok(Value::List(Some(values), Box::new(prototype)))
        }
        Expr::Cast { arg, ty } => {
            let value = evaluate(arg, env)?;
            cast(value, ty)
        }
        Expr::Call { function, args } => call(function, args, env),
        Expr::Member { .. } => {
            let path = member_path(expr)?;
            env.get(&path)
                .cloned()
                .ok_or_else(|| Error::Evaluation(format!("path {} is not bound", path)))
        }
        other => Err(Error::Evaluation(format!(
            "{} nodes cannot be evaluated locally",
            other.kind_name()
        ))),
    }
}

/// Dotted access path of a member chain rooted at a parameter, the explicit
/// capture a local member access binds through (e.g. `user.id`).
fn member_path(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Parameter(param) => Ok(param.name.clone()),
        Expr::Member { base, member } => Ok(format!("{}.{}", member_path(base)?, member)),
        other => Err(Error::Evaluation(format!(
            "{} nodes do not form a bindable access path",
            other.kind_name()
        ))),
    }
}

fn unary(op: UnaryOpType, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOpType::Not, Value::Boolean(v)) => Ok(Value::Boolean(v.map(|v| !v))),
        (UnaryOpType::Negative, Value::Int8(v)) => Ok(Value::Int8(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Int16(v)) => Ok(Value::Int16(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Int32(v)) => Ok(Value::Int32(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Int64(v)) => Ok(Value::Int64(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Float32(v)) => Ok(Value::Float32(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Float64(v)) => Ok(Value::Float64(v.map(|v| -v))),
        (UnaryOpType::Negative, Value::Decimal(v, p, s)) => Ok(Value::Decimal(v.map(|v| -v), p, s)),
        (op, value) => Err(Error::Evaluation(format!(
            "cannot apply {} to {}",
            op,
            value.type_name()
        ))),
    }
}

/// Widened numeric representation used by arithmetic and comparisons.
enum Number {
    Int(i64),
    Float(f64),
}

fn number(value: &Value) -> Option<Number> {
    Some(match value {
        Value::Int8(Some(v)) => Number::Int(*v as i64),
        Value::Int16(Some(v)) => Number::Int(*v as i64),
        Value::Int32(Some(v)) => Number::Int(*v as i64),
        Value::Int64(Some(v)) => Number::Int(*v),
        Value::UInt8(Some(v)) => Number::Int(*v as i64),
        Value::UInt16(Some(v)) => Number::Int(*v as i64),
        Value::UInt32(Some(v)) => Number::Int(*v as i64),
        Value::UInt64(Some(v)) => Number::Int(*v as i64),
        Value::Float32(Some(v)) => Number::Float(*v as f64),
        Value::Float64(Some(v)) => Number::Float(*v),
        _ => return None,
    })
}

fn binary(op: BinaryOpType, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOpType::*;
    match op {
        And | Or => match (lhs, rhs) {
            (Value::Boolean(Some(l)), Value::Boolean(Some(r))) => Ok(Value::Boolean(Some(
                if op == And { l && r } else { l || r },
            ))),
            (lhs, rhs) => Err(Error::Evaluation(format!(
                "cannot apply {} to {} and {}",
                op,
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
        Concat => match (lhs, rhs) {
            (Value::Varchar(Some(l)), Value::Varchar(Some(r))) => Ok(Value::Varchar(Some(l + &r))),
            (lhs, rhs) => Err(Error::Evaluation(format!(
                "cannot concatenate {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
        Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => compare(op, lhs, rhs),
        Addition | Subtraction | Multiplication | Division | Remainder => {
            arithmetic(op, lhs, rhs)
        }
        other => Err(Error::Evaluation(format!(
            "operator {} is not evaluable locally",
            other
        ))),
    }
}

fn compare(op: BinaryOpType, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOpType::*;
    let ordering = match (number(&lhs), number(&rhs)) {
        (Some(Number::Int(l)), Some(Number::Int(r))) => l.partial_cmp(&r),
        (Some(l), Some(r)) => {
            let (l, r) = match (l, r) {
                (Number::Float(l), Number::Float(r)) => (l, r),
                (Number::Float(l), Number::Int(r)) => (l, r as f64),
                (Number::Int(l), Number::Float(r)) => (l as f64, r),
                _ => unreachable!(),
            };
            l.partial_cmp(&r)
        }
        _ => match (&lhs, &rhs) {
            (Value::Varchar(Some(l)), Value::Varchar(Some(r))) => Some(l.cmp(r)),
            _ => {
                return if matches!(op, Equal | NotEqual) {
                    Ok(Value::Boolean(Some((lhs == rhs) == (op == Equal))))
                } else {
                    Err(Error::Evaluation(format!(
                        "cannot order {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                };
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(Some(false)));
    };
    Ok(Value::Boolean(Some(match op {
        Equal => ordering.is_eq(),
        NotEqual => !ordering.is_eq(),
        Less => ordering.is_lt(),
        LessEqual => ordering.is_le(),
        Greater => ordering.is_gt(),
        GreaterEqual => ordering.is_ge(),
        _ => unreachable!(),
    })))
}

fn arithmetic(op: BinaryOpType, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOpType::*;
    match (number(&lhs), number(&rhs)) {
        (Some(Number::Int(l)), Some(Number::Int(r))) => {
            let result = match op {
                Addition => l.checked_add(r),
                Subtraction => l.checked_sub(r),
                Multiplication => l.checked_mul(r),
                Division => l.checked_div(r),
                Remainder => l.checked_rem(r),
                _ => unreachable!(),
            };
            result.map(|v| Value::Int64(Some(v))).ok_or_else(|| {
                Error::Evaluation(format!("{} of {} and {} overflows", op, l, r))
            })
        }
        (Some(l), Some(r)) => {
            let l = match l {
                Number::Int(v) => v as f64,
                Number::Float(v) => v,
            };
            let r = match r {
                Number::Int(v) => v as f64,
                Number::Float(v) => v,
            };
            Ok(Value::Float64(Some(match op {
                Addition => l + r,
                Subtraction => l - r,
                Multiplication => l * r,
                Division => l / r,
                Remainder => l % r,
                _ => unreachable!(),
            })))
        }
        _ => Err(Error::Evaluation(format!(
            "cannot apply {} to {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn cast(value: Value, ty: &Value) -> Result<Value> {
    let result = match (number(&value), ty) {
        (Some(Number::Int(v)), Value::Int32(..)) => Value::Int32(Some(v as i32)),
        (Some(Number::Int(v)), Value::Int64(..)) => Value::Int64(Some(v)),
        (Some(Number::Int(v)), Value::Float64(..)) => Value::Float64(Some(v as f64)),
        (Some(Number::Float(v)), Value::Float64(..)) => Value::Float64(Some(v)),
        (Some(Number::Float(v)), Value::Int64(..)) => Value::Int64(Some(v as i64)),
        (_, Value::Varchar(..)) => Value::Varchar(Some(render_plain(&value)?)),
        _ => {
            return Err(Error::Evaluation(format!(
                "cannot convert {} to {}",
                value.type_name(),
                ty.type_name()
            )));
        }
    };
    Ok(result)
}

fn render_plain(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Varchar(Some(v)) => v.clone(),
        Value::Boolean(Some(v)) => v.to_string(),
        Value::Int8(Some(v)) => v.to_string(),
        Value::Int16(Some(v)) => v.to_string(),
        Value::Int32(Some(v)) => v.to_string(),
        Value::Int64(Some(v)) => v.to_string(),
        Value::UInt8(Some(v)) => v.to_string(),
        Value::UInt16(Some(v)) => v.to_string(),
        Value::UInt32(Some(v)) => v.to_string(),
        Value::UInt64(Some(v)) => v.to_string(),
        Value::Float32(Some(v)) => v.to_string(),
        Value::Float64(Some(v)) => v.to_string(),
        Value::Decimal(Some(v), ..) => v.to_string(),
        Value::Uuid(Some(v)) => v.to_string(),
        other => {
            return Err(Error::Evaluation(format!(
                "cannot render {} as text",
                other.type_name()
            )));
        }
    })
}

fn call(function: &str, args: &[Expr], env: &Environment) -> Result<Value> {
    let values = args
        .iter()
        .map(|arg| evaluate(arg, env))
        .collect::<Result<Vec<_>>>()?;
    match (function.to_ascii_uppercase().as_str(), values.as_slice()) {
        ("UPPER", [Value::Varchar(Some(v))]) => Ok(Value::Varchar(Some(v.to_uppercase()))),
        ("LOWER", [Value::Varchar(Some(v))]) => Ok(Value::Varchar(Some(v.to_lowercase()))),
        ("LENGTH", [Value::Varchar(Some(v))]) => Ok(Value::Int64(Some(v.chars().count() as i64))),
        ("TRIM", [Value::Varchar(Some(v))]) => Ok(Value::Varchar(Some(v.trim().to_owned()))),
        ("COALESCE", values) => Ok(values
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null)),
        _ => Err(Error::Evaluation(format!(
            "function {} is not evaluable locally",
            function
        ))),
    }
}
