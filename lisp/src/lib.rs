pub mod lex;
pub mod ast;
pub mod parse;
pub mod symtab;
pub mod value;
pub mod closure;
pub mod builtins;
pub mod interpret;
pub mod config;

pub use ast::{Node, NodeKind};
pub use config::{ClosureCapture, Config};
pub use interpret::{EvalError, Interpreter};
pub use lex::{check_parentheses, tokenize, LexError, ParenCheck, Token, TokenKind};
pub use parse::{parse, ParseError};
pub use symtab::Env;
pub use value::{Callable, Value};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Tokenize, parse and evaluate `source` in the interpreter's global
/// environment. Definitions made before a failing expression are kept.
pub fn run(interpreter: &mut Interpreter, source: &str) -> Result<Value, Error> {
    let tokens = tokenize(source)?;
    let ast = parse(&tokens)?;
    let global = interpreter.global().clone();
    Ok(interpreter.evaluate(&ast, &global)?)
}
