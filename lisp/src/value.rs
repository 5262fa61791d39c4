//! Runtime values produced by the evaluator.

use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use crate::builtins::Builtin;
use crate::closure::Closure;

#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    Text(String),
    /// a symbol produced by `quote`, never looked up
    Symbol(String),
    Sequence(Vec<Value>),
    Callable(Callable),
    Bool(bool),
    Nil,
}

#[derive(Clone)]
pub enum Callable {
    Builtin(&'static Builtin),
    Closure(Rc<Closure>),
}

impl Value {
    /// `nil`, `false` and the empty list are false; everything else,
    /// including `0`, is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Sequence(items) => !items.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Sequence(_) => "list",
            Value::Callable(_) => "function",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let Value::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Number(a), Number(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            (Sequence(a), Sequence(b)) => a == b,
            (Callable(a), Callable(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Nil, Nil) => true,
            _ => false,
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Builtin(a), Callable::Builtin(b)) => std::ptr::eq(*a, *b),
            (Callable::Closure(a), Callable::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Builtin(builtin) => write!(f, "Builtin({:?})", builtin.name),
            Callable::Closure(closure) => write!(f, "Closure({:?}, {:?})", closure.name, closure.params),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Sequence(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            },
            Value::Callable(Callable::Builtin(builtin)) => write!(f, "<builtin {}>", builtin.name),
            Value::Callable(Callable::Closure(closure)) => match &closure.name {
                Some(name) => write!(f, "<function {}>", name),
                None => write!(f, "<lambda ({})>", closure.params.join(" ")),
            },
            Value::Bool(true) => write!(f, "true"),
            Value::Bool(false) => write!(f, "false"),
            Value::Nil => write!(f, "nil"),
        }
    }
}
