//! Tree-walking evaluation of parsed transform scripts.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::ScriptError;
use super::parser::{BinaryOp, CompareOp, Expr, Stmt, StmtKind, Target};
use crate::formatter::format_value;
use crate::parser::parse_decimal;
use crate::value::{Context, Value};

const BUILTINS: [&str; 14] = [
    "str", "int", "dec", "bool", "len", "lower", "upper", "strip", "replace", "format", "quote",
    "abs", "round", "min",
];

/// Longest string repetition may build.
const MAX_STRING_LEN: usize = 1 << 20;

type EvalResult<T> = Result<T, String>;

pub(crate) fn run(statements: &[Stmt], context: &mut Context) -> Result<(), ScriptError> {
    for stmt in statements {
        execute(stmt, context)?;
    }
    Ok(())
}

fn execute(stmt: &Stmt, context: &mut Context) -> Result<(), ScriptError> {
    let at_line = |message: String| ScriptError::new(stmt.line, message);
    match &stmt.kind {
        StmtKind::Pass => Ok(()),
        StmtKind::Assign { target, op, value } => {
            let value = eval(value, context).map_err(at_line)?;
            let key = match target {
                Target::Name(name) => name.clone(),
                Target::Field(key) => eval(key, context).map_err(at_line)?.to_string(),
            };
            let value = match op {
                None => value,
                Some(op) => {
                    let current = context
                        .get(&key)
                        .ok_or_else(|| at_line(undefined(&key)))?;
                    arithmetic(*op, current, &value).map_err(at_line)?
                }
            };
            context.insert(key, value);
            Ok(())
        }
        StmtKind::If {
            branches,
            otherwise,
        } => {
            for (condition, body) in branches {
                if eval(condition, context).map_err(at_line)?.is_truthy() {
                    return run(body, context);
                }
            }
            run(otherwise, context)
        }
    }
}

fn undefined(name: &str) -> String {
    format!("name '{name}' is not defined")
}

fn eval(expr: &Expr, context: &Context) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => context.get(name).cloned().ok_or_else(|| undefined(name)),
        Expr::Field(key) => {
            let key = eval(key, context)?.to_string();
            context
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("no field named '{key}'"))
        }
        Expr::Neg(operand) => match eval(operand, context)? {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
            Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            Value::Str(_) => Err("bad operand type for unary -: 'str'".to_string()),
        },
        Expr::Pos(operand) => match eval(operand, context)? {
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Str(_) => Err("bad operand type for unary +: 'str'".to_string()),
            number => Ok(number),
        },
        Expr::Not(operand) => Ok(Value::Bool(!eval(operand, context)?.is_truthy())),
        Expr::And(left, right) => {
            let left = eval(left, context)?;
            if left.is_truthy() {
                eval(right, context)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = eval(left, context)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(right, context)
            }
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if eval(condition, context)?.is_truthy() {
                eval(then, context)
            } else {
                eval(otherwise, context)
            }
        }
        Expr::Binary(op, left, right) => {
            arithmetic(*op, &eval(left, context)?, &eval(right, context)?)
        }
        Expr::Compare(op, left, right) => {
            compare(*op, &eval(left, context)?, &eval(right, context)?).map(Value::Bool)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, context))
                .collect::<EvalResult<Vec<_>>>()?;
            call(name, &args)
        }
    }
}

fn overflow() -> String {
    "numeric overflow".to_string()
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Dec(Decimal),
}

impl Num {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Int(i64::from(*b))),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Decimal(d) => Some(Self::Dec(*d)),
            Value::Str(_) => None,
        }
    }

    fn dec(self) -> Decimal {
        match self {
            Self::Int(i) => Decimal::from(i),
            Self::Dec(d) => d,
        }
    }

    fn is_zero(self) -> bool {
        self.dec().is_zero()
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Mul, Value::Str(s), Value::Int(n))
        | (BinaryOp::Mul, Value::Int(n), Value::Str(s)) => {
            let count = usize::try_from(*n).unwrap_or(0);
            return match s.len().checked_mul(count) {
                Some(len) if len <= MAX_STRING_LEN => Ok(Value::Str(s.repeat(count))),
                _ => Err(overflow()),
            };
        }
        _ => {}
    }
    let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) else {
        return Err(format!(
            "unsupported operand types for {op}: '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ));
    };
    if matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) && b.is_zero() {
        return Err("division by zero".to_string());
    }

    let result = match (a, b) {
        (Num::Int(a), Num::Int(b)) => match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int),
            BinaryOp::Div => Decimal::from(a).checked_div(Decimal::from(b)).map(Value::Decimal),
            BinaryOp::FloorDiv => floor_div(a, b).map(Value::Int),
            BinaryOp::Mod => floor_mod(a, b).map(Value::Int),
        },
        (a, b) => {
            let (a, b) = (a.dec(), b.dec());
            match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::FloorDiv => a.checked_div(b).map(|q| q.floor()),
                BinaryOp::Mod => a.checked_rem(b).map(|r| {
                    if !r.is_zero() && r.is_sign_negative() != b.is_sign_negative() {
                        r + b
                    } else {
                        r
                    }
                }),
            }
            .map(Value::Decimal)
        }
    };
    result.ok_or_else(overflow)
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    Some(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q })
}

/// Remainder carrying the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> EvalResult<bool> {
    let ordering = match (Num::of(left), Num::of(right), left, right) {
        (Some(a), Some(b), _, _) => Some(a.dec().cmp(&b.dec())),
        (_, _, Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let ordered = |accept: fn(Ordering) -> bool, symbol: &str| {
        ordering.map(accept).ok_or_else(|| {
            format!(
                "'{symbol}' not supported between '{}' and '{}'",
                left.type_name(),
                right.type_name()
            )
        })
    };
    match op {
        CompareOp::Eq => Ok(ordering == Some(Ordering::Equal)),
        CompareOp::Ne => Ok(ordering != Some(Ordering::Equal)),
        CompareOp::Lt => ordered(Ordering::is_lt, "<"),
        CompareOp::Le => ordered(Ordering::is_le, "<="),
        CompareOp::Gt => ordered(Ordering::is_gt, ">"),
        CompareOp::Ge => ordered(Ordering::is_ge, ">="),
        CompareOp::In | CompareOp::NotIn => match (left, right) {
            (Value::Str(needle), Value::Str(haystack)) => {
                Ok(haystack.contains(needle.as_str()) == (op == CompareOp::In))
            }
            _ => Err(format!(
                "'in' requires string operands, not '{}' and '{}'",
                left.type_name(),
                right.type_name()
            )),
        },
    }
}

fn call(name: &str, args: &[Value]) -> EvalResult<Value> {
    let value = match (name, args) {
        ("str", [v]) => Value::Str(v.to_string()),
        ("int", [v]) => Value::Int(to_int(v)?),
        ("dec", [v]) => Value::Decimal(to_decimal(v)?),
        ("bool", [v]) => Value::Bool(v.is_truthy()),
        ("len", [Value::Str(s)]) => {
            Value::Int(i64::try_from(s.chars().count()).map_err(|_| overflow())?)
        }
        ("lower", [Value::Str(s)]) => Value::Str(s.to_lowercase()),
        ("upper", [Value::Str(s)]) => Value::Str(s.to_uppercase()),
        ("strip", [Value::Str(s)]) => Value::Str(s.trim().to_string()),
        ("replace", [Value::Str(s), Value::Str(from), Value::Str(to)]) => {
            Value::Str(s.replace(from.as_str(), to))
        }
        ("format", [v]) => Value::Str(format_value(v, "").map_err(|e| e.to_string())?),
        ("format", [v, Value::Str(spec)]) => {
            Value::Str(format_value(v, spec).map_err(|e| e.to_string())?)
        }
        ("quote", [v]) => Value::Str(v.shell_quoted()),
        ("abs", [Value::Int(i)]) => Value::Int(i.checked_abs().ok_or_else(overflow)?),
        ("abs", [Value::Decimal(d)]) => Value::Decimal(d.abs()),
        ("round", [Value::Decimal(d)]) => Value::Int(d.round().to_i64().ok_or_else(overflow)?),
        ("round", [Value::Decimal(d), Value::Int(places)]) => {
            let places = u32::try_from(*places)
                .map_err(|_| "round() places must be non-negative".to_string())?;
            Value::Decimal(d.round_dp(places))
        }
        ("round", [Value::Int(i)] | [Value::Int(i), Value::Int(_)]) => Value::Int(*i),
        ("min", [first, rest @ ..]) => {
            let mut least = first;
            for candidate in rest {
                if compare(CompareOp::Lt, candidate, least)? {
                    least = candidate;
                }
            }
            least.clone()
        }
        (known, _) if BUILTINS.contains(&known) => {
            let types: Vec<_> = args.iter().map(Value::type_name).collect();
            return Err(format!(
                "{known}() does not accept arguments ({})",
                types.join(", ")
            ));
        }
        _ => return Err(undefined(name)),
    };
    Ok(value)
}

fn to_int(value: &Value) -> EvalResult<i64> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::Decimal(d) => d.trunc().to_i64().ok_or_else(overflow),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("invalid literal for int(): {}", value.repr())),
    }
}

fn to_decimal(value: &Value) -> EvalResult<Decimal> {
    match value {
        Value::Bool(b) => Ok(Decimal::from(i64::from(*b))),
        Value::Int(i) => Ok(Decimal::from(*i)),
        Value::Decimal(d) => Ok(*d),
        Value::Str(s) => parse_decimal(s.trim())
            .ok_or_else(|| format!("invalid literal for dec(): {}", value.repr())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Program;

    fn run_src(source: &str, context: &mut Context) -> Result<(), ScriptError> {
        Program::compile(source)
            .expect("compile failed")
            .run(context)
    }

    fn eval_src(source: &str) -> Value {
        let mut context = Context::new();
        run_src(&format!("result = {source}"), &mut context).expect("run failed");
        context.remove("result").expect("result missing")
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(s.parse().expect("decimal"))
    }

    #[test]
    fn integer_arithmetic_floors() {
        assert_eq!(eval_src("7 // 2"), Value::Int(3));
        assert_eq!(eval_src("-7 // 2"), Value::Int(-4));
        assert_eq!(eval_src("-7 % 3"), Value::Int(2));
        assert_eq!(eval_src("7 % -3"), Value::Int(-2));
        assert_eq!(eval_src("2 + 3 * 4"), Value::Int(14));
    }

    #[test]
    fn true_division_is_exact() {
        assert_eq!(eval_src("1 / 4"), dec("0.25"));
        assert_eq!(eval_src("0.1 + 0.2"), dec("0.3"));
        assert_eq!(eval_src("2.5 // 1"), dec("2"));
    }

    #[test]
    fn strings() {
        assert_eq!(eval_src("'ab' + 'cd'"), Value::from("abcd"));
        assert_eq!(eval_src("'-' * 3"), Value::from("---"));
        assert_eq!(eval_src("upper(strip('  x '))"), Value::from("X"));
        assert_eq!(eval_src("replace('a-b', '-', '_')"), Value::from("a_b"));
        assert_eq!(eval_src("'b' in 'abc'"), Value::Bool(true));
        assert_eq!(eval_src("len('héllo')"), Value::Int(5));
    }

    #[test]
    fn builtins_convert() {
        assert_eq!(eval_src("int('42') + 1"), Value::Int(43));
        assert_eq!(eval_src("int(2.9)"), Value::Int(2));
        assert_eq!(eval_src("dec('1.50')"), dec("1.50"));
        assert_eq!(eval_src("format(255, '#x')"), Value::from("0xff"));
        assert_eq!(eval_src("str(True)"), Value::from("true"));
        assert_eq!(eval_src("quote('a b')"), Value::from("'a b'"));
        assert_eq!(eval_src("round(2.5)"), Value::Int(2));
        assert_eq!(eval_src("round(1.005, 2)"), dec("1.00"));
        assert_eq!(eval_src("min(3, 1.5, 2)"), dec("1.5"));
    }

    #[test]
    fn boolean_operators_short_circuit() {
        assert_eq!(eval_src("0 or 'fallback'"), Value::from("fallback"));
        assert_eq!(eval_src("'' and undefined_name"), Value::from(""));
        assert_eq!(eval_src("not 0"), Value::Bool(true));
        assert_eq!(eval_src("'y' if 1 < 2 else 'n'"), Value::from("y"));
    }

    #[test]
    fn mixed_comparisons() {
        assert_eq!(eval_src("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval_src("'1' == 1"), Value::Bool(false));
        assert_eq!(eval_src("'a' < 'b'"), Value::Bool(true));
    }

    #[test]
    fn fields_subscript_reads_and_writes() {
        let mut context = Context::new();
        context.insert("-n".into(), Value::Int(2));
        run_src("fields['-n'] += 1\ncount = fields['-n']", &mut context).expect("run failed");
        assert_eq!(context["-n"], Value::Int(3));
        assert_eq!(context["count"], Value::Int(3));
    }

    #[test]
    fn if_chain_picks_first_truthy_branch() {
        let mut context = Context::new();
        context.insert("level".into(), Value::Int(2));
        let source = "if level == 1:\n    name = 'one'\nelif level == 2:\n    name = 'two'\nelse:\n    name = 'many'\n";
        run_src(source, &mut context).expect("run failed");
        assert_eq!(context["name"], Value::from("two"));
    }

    #[test]
    fn runtime_errors_carry_the_line() {
        let mut context = Context::new();
        let err = run_src("x = 1\ny = x / 0", &mut context).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "division by zero");

        let err = run_src("z = missing + 1", &mut context).unwrap_err();
        assert_eq!(err.message, "name 'missing' is not defined");

        let err = run_src("z = 'a' - 1", &mut context).unwrap_err();
        assert_eq!(err.message, "unsupported operand types for -: 'str' and 'int'");

        let err = run_src("z = 1\nz = 'ab' * 9223372036854775807", &mut context).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "numeric overflow");
        let err = run_src("z = 'x' * 1048577", &mut context).unwrap_err();
        assert_eq!(err.message, "numeric overflow");

        let err = run_src("z = 9223372036854775807 + 1", &mut context).unwrap_err();
        assert_eq!(err.message, "numeric overflow");
    }
}
