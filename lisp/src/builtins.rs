//! Functions preloaded into the global environment.

use crate::ast::Node;
use crate::interpret::{EvalError, EvalResult, Interpreter};
use crate::symtab::Env;
use crate::value::{Callable, Value};

pub type StrictFn = fn(&[Value]) -> EvalResult<Value>;
pub type ShortCircuitFn = fn(&mut Interpreter, &[Node], &Env) -> EvalResult<Value>;

#[derive(Clone, Copy)]
pub enum BuiltinKind {
    /// called with every argument already evaluated, left to right
    Strict(StrictFn),
    /// called with the argument nodes, evaluates only as many as it needs
    ShortCircuit(ShortCircuitFn),
}

pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
}

pub static BUILTINS: &[Builtin] = &[
    strict("+", add),
    strict("-", sub),
    strict("*", mul),
    strict("/", div),
    strict("=", num_eq),
    strict("<", lt),
    strict(">", gt),
    strict("car", car),
    strict("cdr", cdr),
    strict("cons", cons),
    strict("list", list),
    strict("progn", progn),
    short_circuit("and", and),
    short_circuit("or", or),
    strict("not", not),
    strict("null?", null_p),
    strict("number?", number_p),
    strict("symbol?", symbol_p),
    strict("list?", list_p),
];

const fn strict(name: &'static str, f: StrictFn) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Strict(f),
    }
}

const fn short_circuit(name: &'static str, f: ShortCircuitFn) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::ShortCircuit(f),
    }
}

/// Bind every builtin under its name in `env`.
pub fn install(env: &Env) {
    for builtin in BUILTINS {
        env.insert(builtin.name, Value::Callable(Callable::Builtin(builtin)));
    }
}

fn type_error(op: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::ArityOrType(format!("`{}` expects {}, got {}", op, expected, got.type_name()))
}

fn exact_arity(op: &str, args: &[Value], n: usize) -> EvalResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(EvalError::ArityOrType(format!(
            "`{}` expects {} argument(s), got {}",
            op,
            n,
            args.len()
        )))
    }
}

fn min_arity(op: &str, args: &[Value], n: usize) -> EvalResult<()> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(EvalError::ArityOrType(format!(
            "`{}` expects at least {} argument(s), got {}",
            op,
            n,
            args.len()
        )))
    }
}

fn numbers(op: &str, args: &[Value]) -> EvalResult<Vec<f64>> {
    args.iter()
        .map(|arg| arg.as_number().ok_or_else(|| type_error(op, "numbers", arg)))
        .collect()
}

fn add(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(numbers("+", args)?.into_iter().sum()))
}

fn mul(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(numbers("*", args)?.into_iter().product()))
}

fn sub(args: &[Value]) -> EvalResult<Value> {
    let nums = numbers("-", args)?;
    match nums.split_first() {
        Some((x, [])) => Ok(Value::Number(-x)),
        Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |acc, x| acc - x))),
        None => min_arity("-", args, 1).map(|_| Value::Nil),
    }
}

fn div(args: &[Value]) -> EvalResult<Value> {
    let nums = numbers("/", args)?;
    let (first, divisors) = match nums.split_first() {
        Some((x, [])) => (1.0, std::slice::from_ref(x)),
        Some((first, rest)) => (*first, rest),
        None => return min_arity("/", args, 1).map(|_| Value::Nil),
    };
    divisors
        .iter()
        .try_fold(first, |acc, d| {
            if *d == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(acc / d)
            }
        })
        .map(Value::Number)
}

fn num_eq(args: &[Value]) -> EvalResult<Value> {
    min_arity("=", args, 1)?;
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
}

fn lt(args: &[Value]) -> EvalResult<Value> {
    min_arity("<", args, 1)?;
    let nums = numbers("<", args)?;
    Ok(Value::Bool(nums.windows(2).all(|w| w[0] < w[1])))
}

fn gt(args: &[Value]) -> EvalResult<Value> {
    min_arity(">", args, 1)?;
    let nums = numbers(">", args)?;
    Ok(Value::Bool(nums.windows(2).all(|w| w[0] > w[1])))
}

fn car(args: &[Value]) -> EvalResult<Value> {
    exact_arity("car", args, 1)?;
    match &args[0] {
        Value::Sequence(items) => items.first().cloned().ok_or(EvalError::NilAccess("car")),
        Value::Nil => Err(EvalError::NilAccess("car")),
        other => Err(type_error("car", "a list", other)),
    }
}

fn cdr(args: &[Value]) -> EvalResult<Value> {
    exact_arity("cdr", args, 1)?;
    match &args[0] {
        Value::Sequence(items) if !items.is_empty() => Ok(Value::Sequence(items[1..].to_vec())),
        Value::Sequence(_) | Value::Nil => Err(EvalError::NilAccess("cdr")),
        other => Err(type_error("cdr", "a list", other)),
    }
}

fn cons(args: &[Value]) -> EvalResult<Value> {
    exact_arity("cons", args, 2)?;
    match &args[1] {
        Value::Sequence(items) => {
            let mut result = Vec::with_capacity(items.len() + 1);
            result.push(args[0].clone());
            result.extend(items.iter().cloned());
            Ok(Value::Sequence(result))
        },
        Value::Nil => Ok(Value::Sequence(vec![args[0].clone()])),
        other => Err(type_error("cons", "a list as its second argument", other)),
    }
}

fn list(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Sequence(args.to_vec()))
}

fn progn(args: &[Value]) -> EvalResult<Value> {
    Ok(args.last().cloned().unwrap_or(Value::Nil))
}

fn and(interpreter: &mut Interpreter, args: &[Node], env: &Env) -> EvalResult<Value> {
    let mut last = Value::Bool(true);
    for arg in args {
        last = interpreter.evaluate(arg, env)?;
        if !last.is_truthy() {
            break;
        }
    }
    Ok(last)
}

fn or(interpreter: &mut Interpreter, args: &[Node], env: &Env) -> EvalResult<Value> {
    for arg in args {
        let value = interpreter.evaluate(arg, env)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
    Ok(Value::Nil)
}

fn not(args: &[Value]) -> EvalResult<Value> {
    exact_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn null_p(args: &[Value]) -> EvalResult<Value> {
    exact_arity("null?", args, 1)?;
    let null = match &args[0] {
        Value::Nil => true,
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    };
    Ok(Value::Bool(null))
}

fn number_p(args: &[Value]) -> EvalResult<Value> {
    exact_arity("number?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Number(_))))
}

fn symbol_p(args: &[Value]) -> EvalResult<Value> {
    exact_arity("symbol?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

fn list_p(args: &[Value]) -> EvalResult<Value> {
    exact_arity("list?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Sequence(_))))
}
