//! Evaluation of ASTs

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Node, NodeKind};
use crate::builtins::{self, BuiltinKind};
use crate::closure::Closure;
use crate::config::{ClosureCapture, Config};
use crate::symtab::Env;
use crate::value::{Callable, Value};

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum EvalError {
    #[error("unbound symbol `{0}`")]
    UnboundSymbol(String),
    #[error("`{0}` is not callable")]
    NotCallable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{0}` of an empty list")]
    NilAccess(&'static str),
    #[error("{0}")]
    ArityOrType(String),
    /// A hand-built tree that the parser would never produce.
    #[error("malformed {0} node")]
    Malformed(NodeKind),
}

pub type EvalResult<T> = Result<T, EvalError>;

pub struct Interpreter {
    global: Env,
    config: Config,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let global = Env::new();
        builtins::install(&global);
        Interpreter { global, config }
    }

    /// The global frame: the environment for top-level evaluation and the
    /// target of every `define` and `defun`.
    pub fn global(&self) -> &Env {
        &self.global
    }

    /// Evaluate `node` with `env` as the local scope. Names are looked up in
    /// `env` first, then in the global frame.
    pub fn evaluate(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        log::trace!("eval {}", node.kind());
        match node.kind() {
            NodeKind::Number => number_literal(node),
            NodeKind::String => Ok(Value::Text(text(node)?.to_string())),
            NodeKind::Symbol | NodeKind::Keyword | NodeKind::Operator => self.lookup(env, text(node)?),
            NodeKind::Nil => Ok(Value::Nil),
            NodeKind::Program => self.evaluate_body(node.children(), env),
            NodeKind::List => self.evaluate_list(node, env),
            NodeKind::Quote => Ok(quote(child(node, 0)?)),
            NodeKind::Define => self.evaluate_define(node, env),
            NodeKind::Lambda => self.evaluate_lambda(node, env),
            NodeKind::If => self.evaluate_if(node, env),
            NodeKind::Cond => self.evaluate_cond(node, env),
            NodeKind::Let => self.evaluate_let(node, env),
            NodeKind::Setq => self.evaluate_setq(node, env),
            kind @ (NodeKind::Clause | NodeKind::Bindings | NodeKind::Binding | NodeKind::Params) => {
                Err(EvalError::Malformed(kind))
            },
        }
    }

    /// Evaluate in order, returning the last value (`nil` if there is none).
    fn evaluate_body(&mut self, body: &[Node], env: &Env) -> EvalResult<Value> {
        let mut result = Value::Nil;
        for expr in body {
            result = self.evaluate(expr, env)?;
        }
        Ok(result)
    }

    fn evaluate_list(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let (head, args) = match node.children().split_first() {
            Some(split) => split,
            None => return Ok(Value::Sequence(Vec::new())),
        };
        let callable = match self.evaluate(head, env)? {
            Value::Callable(callable) => callable,
            other => return Err(EvalError::NotCallable(other.to_string())),
        };
        match callable {
            Callable::Builtin(builtin) => match builtin.kind {
                BuiltinKind::ShortCircuit(f) => f(self, args, env),
                BuiltinKind::Strict(f) => {
                    let args = self.evaluate_args(args, env)?;
                    f(&args)
                },
            },
            Callable::Closure(closure) => {
                let args = self.evaluate_args(args, env)?;
                self.call(&closure, args)
            },
        }
    }

    fn lookup(&self, env: &Env, name: &str) -> EvalResult<Value> {
        env.get(name)
            .or_else(|| self.global.get(name))
            .ok_or_else(|| EvalError::UnboundSymbol(name.to_string()))
    }

    /// A new local scope on top of `env`. Scopes opened at top level start a
    /// chain of their own instead of forking the global frame.
    fn open_scope(&self, env: &Env) -> Env {
        if env.ptr_eq(&self.global) {
            Env::new()
        } else {
            env.fork()
        }
    }

    fn evaluate_args(&mut self, args: &[Node], env: &Env) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(arg, env)).collect()
    }

    /// Run a closure's body in a fresh frame holding `args`.
    pub fn call(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        log::debug!("call {} with {} argument(s)", closure.display_name(), args.len());
        let frame = closure.bind_args(args)?;
        self.evaluate_body(&closure.body, &frame)
    }

    /// The local scopes a new closure keeps. The global frame is never
    /// captured, so a closure stored there does not keep its own frame alive.
    fn capture(&self, env: &Env) -> Env {
        if env.ptr_eq(&self.global) {
            return Env::new();
        }
        match self.config.closure_capture {
            ClosureCapture::Linked => env.clone(),
            ClosureCapture::Snapshot => env.snapshot(),
        }
    }

    fn make_closure(&self, name: Option<String>, params: &Node, body: &[Node], env: &Env) -> EvalResult<Value> {
        let params = params
            .children()
            .iter()
            .map(|param| text(param).map(str::to_string))
            .collect::<EvalResult<Vec<_>>>()?;
        let closure = Closure::new(
            name,
            params,
            body.to_vec(),
            self.capture(env),
            self.config.closure_capture,
        );
        Ok(Value::Callable(Callable::Closure(Rc::new(closure))))
    }

    /// (define name expr) / (defun name (params ...) body ...); both bind
    /// globally, whatever scope they appear in.
    fn evaluate_define(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let keyword = text(child(node, 0)?)?;
        let name = text(child(node, 1)?)?.to_string();
        let value = if keyword == "defun" {
            let params = child(node, 2)?;
            self.make_closure(Some(name.clone()), params, &node.children()[3..], env)?
        } else {
            self.evaluate(child(node, 2)?, env)?
        };
        log::debug!("{} {} = {}", keyword, name, value);
        self.global.insert(name.as_str(), value);
        Ok(Value::Symbol(name))
    }

    fn evaluate_lambda(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let params = child(node, 0)?;
        self.make_closure(None, params, &node.children()[1..], env)
    }

    fn evaluate_if(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let condition = self.evaluate(child(node, 0)?, env)?;
        if condition.is_truthy() {
            self.evaluate(child(node, 1)?, env)
        } else {
            match node.children().get(2) {
                Some(otherwise) => self.evaluate(otherwise, env),
                None => Ok(Value::Nil),
            }
        }
    }

    fn evaluate_cond(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        for clause in node.children() {
            let (test, body) = clause
                .children()
                .split_first()
                .ok_or(EvalError::Malformed(NodeKind::Clause))?;
            let condition = self.evaluate(test, env)?;
            if condition.is_truthy() {
                if body.is_empty() {
                    return Ok(condition);
                }
                return self.evaluate_body(body, env);
            }
        }
        Ok(Value::Nil)
    }

    /// Every value is computed in the enclosing scope before any name is
    /// bound, so bindings cannot refer to one another.
    fn evaluate_let(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let bindings = child(node, 0)?;
        let mut values = Vec::with_capacity(bindings.children().len());
        for binding in bindings.children() {
            let name = text(child(binding, 0)?)?;
            let value = self.evaluate(child(binding, 1)?, env)?;
            values.push((name, value));
        }
        let frame = self.open_scope(env);
        for (name, value) in values {
            frame.insert(name, value);
        }
        self.evaluate_body(&node.children()[1..], &frame)
    }

    /// Assign to the nearest scope that binds the name, else define it
    /// globally.
    fn evaluate_setq(&mut self, node: &Node, env: &Env) -> EvalResult<Value> {
        let name = text(child(node, 0)?)?;
        let value = self.evaluate(child(node, 1)?, env)?;
        log::debug!("setq {} = {}", name, value);
        if let Err(value) = env.assign(name, value.clone()) {
            self.global.insert(name, value);
        }
        Ok(value)
    }
}

fn child(node: &Node, index: usize) -> EvalResult<&Node> {
    node.children()
        .get(index)
        .ok_or(EvalError::Malformed(node.kind()))
}

fn text(node: &Node) -> EvalResult<&str> {
    node.text().ok_or(EvalError::Malformed(node.kind()))
}

fn number_literal(node: &Node) -> EvalResult<Value> {
    text(node)?
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| EvalError::Malformed(NodeKind::Number))
}

/// The value a quoted tree stands for. Nothing is evaluated: symbols stay
/// symbols, and special forms come back as lists headed by their keyword.
pub fn quote(node: &Node) -> Value {
    let items = |head: Option<&str>| {
        let head = head.map(|h| Value::Symbol(h.to_string()));
        Value::Sequence(head.into_iter().chain(node.children().iter().map(quote)).collect())
    };
    match node.kind() {
        NodeKind::Number => {
            let literal = node.text().unwrap_or_default();
            literal
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::Symbol(literal.to_string()))
        },
        NodeKind::String => Value::Text(node.text().unwrap_or_default().to_string()),
        NodeKind::Symbol | NodeKind::Keyword | NodeKind::Operator => {
            Value::Symbol(node.text().unwrap_or_default().to_string())
        },
        NodeKind::Nil => Value::Nil,
        NodeKind::Lambda => items(Some("lambda")),
        NodeKind::If => items(Some("if")),
        NodeKind::Cond => items(Some("cond")),
        NodeKind::Let => items(Some("let")),
        NodeKind::Setq => items(Some("setq")),
        NodeKind::Quote => items(Some("quote")),
        // a define keeps its keyword as the first child
        NodeKind::Define
        | NodeKind::Program
        | NodeKind::List
        | NodeKind::Clause
        | NodeKind::Bindings
        | NodeKind::Binding
        | NodeKind::Params => items(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;
    use crate::parse::parse;
    use crate::{run, Error};

    fn interpreter() -> Interpreter {
        let _ = env_logger::builder().is_test(true).try_init();
        Interpreter::new()
    }

    fn eval_str(interpreter: &mut Interpreter, source: &str) -> EvalResult<Value> {
        match run(interpreter, source) {
            Ok(value) => Ok(value),
            Err(Error::Eval(err)) => Err(err),
            Err(other) => panic!("{:?} did not reach evaluation: {}", source, other),
        }
    }

    fn eval_fresh(source: &str) -> EvalResult<Value> {
        eval_str(&mut interpreter(), source)
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    fn sym(name: &str) -> Value {
        Value::Symbol(name.to_string())
    }

    fn seq(items: Vec<Value>) -> Value {
        Value::Sequence(items)
    }

    #[test]
    fn test_interpret() {
        let test_cases = [
            ("(+ 1 2)", n(3.0)),
            ("42", n(42.0)),
            ("-2.5", n(-2.5)),
            ("\"hi\"", Value::Text("hi".to_string())),
            ("()", seq(vec![])),
            ("", Value::Nil),
            ("(* 2 (- 10 4) (/ 9 3))", n(36.0)),
            ("(- 5)", n(-5.0)),
            ("(if (> 3 2) 1 0)", n(1.0)),
            ("(if (> 2 3) 1 0)", n(0.0)),
            ("(if (> 2 3) 1)", Value::Nil),
            ("(if 0 1 2)", n(1.0)),
            ("(if () 1 2)", n(2.0)),
            ("(list 1 (+ 1 1) 3)", seq(vec![n(1.0), n(2.0), n(3.0)])),
            ("(car (cdr (list 1 2 3)))", n(2.0)),
            ("(cons 0 (list 1))", seq(vec![n(0.0), n(1.0)])),
            ("(progn 1 2 3)", n(3.0)),
            ("(= 1 1 1)", Value::Bool(true)),
            ("(< 1 2 2)", Value::Bool(false)),
            ("(not ())", Value::Bool(true)),
            ("(null? (cdr (list 1)))", Value::Bool(true)),
            ("(symbol? (quote a))", Value::Bool(true)),
            ("(number? (quote a))", Value::Bool(false)),
            ("(list? (quote (a)))", Value::Bool(true)),
            ("((lambda (x y) (* x y)) 3 4)", n(12.0)),
            ("(define x 1) (define y 2) (+ x y)", n(3.0)),
        ];
        for (source, expected) in test_cases {
            assert_eq!(eval_fresh(source), Ok(expected), "source: {:?}", source);
        }
    }

    #[test]
    fn test_entry_points() {
        let mut interpreter = interpreter();
        let tokens = tokenize("(+ 1 2)").unwrap();
        let ast = parse(&tokens).unwrap();
        let global = interpreter.global().clone();
        assert_eq!(interpreter.evaluate(&ast, &global), Ok(n(3.0)));
    }

    #[test]
    fn test_define() {
        let mut interpreter = interpreter();
        assert_eq!(eval_str(&mut interpreter, "(define x 42)"), Ok(sym("x")));
        assert_eq!(eval_str(&mut interpreter, "x"), Ok(n(42.0)));
        assert_eq!(eval_str(&mut interpreter, "(define x (+ x 1))"), Ok(sym("x")));
        assert_eq!(eval_str(&mut interpreter, "x"), Ok(n(43.0)));
    }

    #[test]
    fn test_define_inside_function_is_global() {
        let mut interpreter = interpreter();
        eval_str(&mut interpreter, "(defun remember (v) (define kept v) v)").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(remember 7)"), Ok(n(7.0)));
        assert_eq!(eval_str(&mut interpreter, "kept"), Ok(n(7.0)));
        assert_eq!(eval_str(&mut interpreter, "v"), Err(EvalError::UnboundSymbol("v".to_string())));
    }

    #[test]
    fn test_defun() {
        let mut interpreter = interpreter();
        assert_eq!(eval_str(&mut interpreter, "(defun sq (y) (* y y))"), Ok(sym("sq")));
        assert_eq!(eval_str(&mut interpreter, "(sq 5)"), Ok(n(25.0)));
        eval_str(&mut interpreter, "(defun fact (n) (if (< n 2) 1 (* n (fact (- n 1)))))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(fact 5)"), Ok(n(120.0)));
        eval_str(&mut interpreter, "(defun nothing ())").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(nothing)"), Ok(Value::Nil));
        eval_str(&mut interpreter, "(defun two-steps (a) (setq a (+ a 1)) (* a 10))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(two-steps 1)"), Ok(n(20.0)));
        assert!(matches!(
            eval_str(&mut interpreter, "(sq 1 2)"),
            Err(EvalError::ArityOrType(_))
        ));
    }

    #[test]
    fn test_quote() {
        let test_cases = [
            ("(quote (a b c))", seq(vec![sym("a"), sym("b"), sym("c")])),
            ("(quote undefined-symbol)", sym("undefined-symbol")),
            (
                "(quote (1 \"s\" (+ x)))",
                seq(vec![n(1.0), Value::Text("s".to_string()), seq(vec![sym("+"), sym("x")])]),
            ),
            ("(quote (if a b))", seq(vec![sym("if"), sym("a"), sym("b")])),
            ("(quote (define x 1))", seq(vec![sym("define"), sym("x"), n(1.0)])),
            (
                "(quote (let ((a 1)) a))",
                seq(vec![sym("let"), seq(vec![seq(vec![sym("a"), n(1.0)])]), sym("a")]),
            ),
            ("(quote (quote x))", seq(vec![sym("quote"), sym("x")])),
            ("(quote ())", seq(vec![])),
        ];
        for (source, expected) in test_cases {
            assert_eq!(eval_fresh(source), Ok(expected), "source: {:?}", source);
        }
    }

    #[test]
    fn test_cond() {
        let mut interpreter = interpreter();
        eval_str(
            &mut interpreter,
            "(defun sign (x) (cond ((< x 0) (quote neg)) ((= x 0) (quote zero)) ((> x 0) 1 (quote pos))))",
        )
        .unwrap();
        assert_eq!(eval_str(&mut interpreter, "(sign -3)"), Ok(sym("neg")));
        assert_eq!(eval_str(&mut interpreter, "(sign 0)"), Ok(sym("zero")));
        assert_eq!(eval_str(&mut interpreter, "(sign 9)"), Ok(sym("pos")));
        assert_eq!(eval_str(&mut interpreter, "(cond ((> 1 2) 1))"), Ok(Value::Nil));
        assert_eq!(eval_str(&mut interpreter, "(cond)"), Ok(Value::Nil));
        assert_eq!(eval_str(&mut interpreter, "(cond ((+ 1 1)))"), Ok(n(2.0)));
        // later clauses are never evaluated
        assert_eq!(
            eval_str(&mut interpreter, "(cond (1 (quote first)) ((car (list)) 2))"),
            Ok(sym("first"))
        );
    }

    #[test]
    fn test_if_evaluates_one_branch() {
        let mut interpreter = interpreter();
        eval_str(&mut interpreter, "(define hits 0)").unwrap();
        eval_str(&mut interpreter, "(if 1 (setq hits (+ hits 1)) (setq hits 100))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "hits"), Ok(n(1.0)));
        assert_eq!(eval_str(&mut interpreter, "(if () (car (list)) 5)"), Ok(n(5.0)));
    }

    #[test]
    fn test_let_is_simultaneous() {
        let mut interpreter = interpreter();
        assert_eq!(eval_str(&mut interpreter, "(let ((a 1) (b 2)) (+ a b))"), Ok(n(3.0)));
        eval_str(&mut interpreter, "(define a 10)").unwrap();
        // `b` sees the outer `a`, not the one bound beside it
        assert_eq!(eval_str(&mut interpreter, "(let ((a 1) (b a)) b)"), Ok(n(10.0)));
        assert_eq!(
            eval_fresh("(let ((a 1) (b a)) b)"),
            Err(EvalError::UnboundSymbol("a".to_string()))
        );
        assert_eq!(eval_str(&mut interpreter, "(let ((a 1)) (let ((a 2)) a))"), Ok(n(2.0)));
        assert_eq!(eval_str(&mut interpreter, "(let () 1 2)"), Ok(n(2.0)));
        assert_eq!(eval_str(&mut interpreter, "a"), Ok(n(10.0)));
    }

    #[test]
    fn test_setq() {
        let mut interpreter = interpreter();
        assert_eq!(eval_str(&mut interpreter, "(setq fresh 5)"), Ok(n(5.0)));
        assert_eq!(eval_str(&mut interpreter, "fresh"), Ok(n(5.0)));

        eval_str(&mut interpreter, "(define g 1)").unwrap();
        // the local binding shadows and receives the assignment
        assert_eq!(eval_str(&mut interpreter, "(let ((g 2)) (setq g 3) g)"), Ok(n(3.0)));
        assert_eq!(eval_str(&mut interpreter, "g"), Ok(n(1.0)));
        // no local binding: the global one is updated
        assert_eq!(eval_str(&mut interpreter, "(let ((other 0)) (setq g 4))"), Ok(n(4.0)));
        assert_eq!(eval_str(&mut interpreter, "g"), Ok(n(4.0)));
    }

    #[test]
    fn test_and_or_short_circuit() {
        let test_cases = [
            ("(and)", Value::Bool(true)),
            ("(and 1 2 3)", n(3.0)),
            ("(and 1 () (car (list)))", seq(vec![])),
            ("(or)", Value::Nil),
            ("(or () 0 (car (list)))", n(0.0)),
            ("(or () (> 1 2))", Value::Nil),
        ];
        for (source, expected) in test_cases {
            assert_eq!(eval_fresh(source), Ok(expected), "source: {:?}", source);
        }
    }

    #[test]
    fn test_closures_see_later_changes() {
        let mut interpreter = interpreter();
        eval_str(
            &mut interpreter,
            "(defun make-counter () (let ((count 0)) (lambda () (setq count (+ count 1)))))",
        )
        .unwrap();
        eval_str(&mut interpreter, "(define c (make-counter))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(c)"), Ok(n(1.0)));
        assert_eq!(eval_str(&mut interpreter, "(c)"), Ok(n(2.0)));
        assert_eq!(eval_str(&mut interpreter, "count"), Err(EvalError::UnboundSymbol("count".to_string())));

        let source = "(let ((x 1)) (let ((f (lambda () x))) (setq x 2) (f)))";
        assert_eq!(eval_str(&mut interpreter, source), Ok(n(2.0)));
        eval_str(&mut interpreter, "(define late-ref (lambda () later))").unwrap();
        eval_str(&mut interpreter, "(define later 9)").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(late-ref)"), Ok(n(9.0)));
    }

    fn snapshot_interpreter() -> Interpreter {
        let _ = env_logger::builder().is_test(true).try_init();
        Interpreter::with_config(Config {
            closure_capture: ClosureCapture::Snapshot,
        })
    }

    #[test]
    fn test_snapshot_capture() {
        let mut interpreter = snapshot_interpreter();
        let source = "(let ((x 1)) (let ((f (lambda () x))) (setq x 2) (f)))";
        assert_eq!(eval_str(&mut interpreter, source), Ok(n(1.0)));
        // globals stay live, so recursion still works
        eval_str(&mut interpreter, "(defun down (n) (if (< n 1) 0 (down (- n 1))))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(down 3)"), Ok(n(0.0)));
        eval_str(&mut interpreter, "(define late-ref (lambda () later))").unwrap();
        eval_str(&mut interpreter, "(define later 9)").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(late-ref)"), Ok(n(9.0)));
    }

    #[test]
    fn test_snapshot_calls_do_not_see_each_other() {
        let mut interpreter = snapshot_interpreter();
        eval_str(&mut interpreter, "(defun mk () (let ((n 0)) (lambda () (setq n (+ n 1)))))").unwrap();
        eval_str(&mut interpreter, "(define c (mk))").unwrap();
        assert_eq!(eval_str(&mut interpreter, "(c)"), Ok(n(1.0)));
        assert_eq!(eval_str(&mut interpreter, "(c)"), Ok(n(1.0)));
        // a global assigned inside a call is still shared
        eval_str(&mut interpreter, "(define total 0)").unwrap();
        eval_str(&mut interpreter, "(defun bump () (setq total (+ total 1)))").unwrap();
        eval_str(&mut interpreter, "(bump) (bump)").unwrap();
        assert_eq!(eval_str(&mut interpreter, "total"), Ok(n(2.0)));
    }

    #[test]
    fn test_defun_inside_call() {
        for mut interpreter in [interpreter(), snapshot_interpreter()] {
            eval_str(&mut interpreter, "(defun outer (a) (defun inner () a) (inner))").unwrap();
            assert_eq!(eval_str(&mut interpreter, "(outer 5)"), Ok(n(5.0)));
            assert_eq!(eval_str(&mut interpreter, "(inner)"), Ok(n(5.0)));
            assert_eq!(eval_str(&mut interpreter, "(outer 6)"), Ok(n(6.0)));
            assert_eq!(eval_str(&mut interpreter, "(inner)"), Ok(n(6.0)));
            assert_eq!(eval_str(&mut interpreter, "a"), Err(EvalError::UnboundSymbol("a".to_string())));
        }
    }

    #[test]
    fn test_local_env_falls_back_to_globals() {
        let mut interpreter = interpreter();
        eval_str(&mut interpreter, "(define g 10)").unwrap();
        let local = Env::new();
        local.insert("x", n(2.0));
        let tokens = tokenize("(+ 1 x g)").unwrap();
        let ast = parse(&tokens).unwrap();
        assert_eq!(interpreter.evaluate(&ast, &local), Ok(n(13.0)));

        let tokens = tokenize("(setq x 3) (setq g 4)").unwrap();
        let ast = parse(&tokens).unwrap();
        interpreter.evaluate(&ast, &local).unwrap();
        assert_eq!(local.get("x"), Some(n(3.0)));
        assert_eq!(eval_str(&mut interpreter, "g"), Ok(n(4.0)));
        assert!(!local.contains_key("g"));
    }

    #[test]
    fn test_global_closures_do_not_capture_globals() {
        for mut interpreter in [interpreter(), snapshot_interpreter()] {
            eval_str(&mut interpreter, "(defun sq (y) (* y y))").unwrap();
            eval_str(&mut interpreter, "(define in-let (let ((k 2)) (lambda (y) (* k y))))").unwrap();
            for name in ["sq", "in-let"] {
                match interpreter.global().get(name) {
                    Some(Value::Callable(Callable::Closure(closure))) => {
                        assert!(!closure.env.ptr_eq(interpreter.global()));
                        assert!(!closure.env.contains_key("sq"));
                        assert!(!closure.env.contains_key("+"));
                    },
                    other => panic!("{} is not a closure: {:?}", name, other),
                }
            }
            assert_eq!(eval_str(&mut interpreter, "(+ (sq 3) (in-let 5))"), Ok(n(19.0)));
        }
    }

    #[test]
    fn test_calls_do_not_share_frames() {
        let mut interpreter = interpreter();
        eval_str(&mut interpreter, "(defun pair (a b) (list a b))").unwrap();
        eval_str(&mut interpreter, "(defun wrap (a) (pair (pair a 1) a))").unwrap();
        assert_eq!(
            eval_str(&mut interpreter, "(wrap 0)"),
            Ok(seq(vec![seq(vec![n(0.0), n(1.0)]), n(0.0)]))
        );
        assert_eq!(interpreter.global().depth(), 0);
        assert!(!interpreter.global().contains_key("a"));
    }

    #[test]
    fn test_errors() {
        let test_cases = [
            ("(/ 1 0)", EvalError::DivisionByZero),
            ("(car (list))", EvalError::NilAccess("car")),
            ("(cdr (quote ()))", EvalError::NilAccess("cdr")),
            ("nope", EvalError::UnboundSymbol("nope".to_string())),
            ("(eval 1)", EvalError::UnboundSymbol("eval".to_string())),
            ("(1 2)", EvalError::NotCallable("1".to_string())),
            ("((quote f) 2)", EvalError::NotCallable("f".to_string())),
        ];
        for (source, expected) in test_cases {
            assert_eq!(eval_fresh(source), Err(expected), "source: {:?}", source);
        }
        assert!(matches!(eval_fresh("(+ 1 (quote a))"), Err(EvalError::ArityOrType(_))));
    }

    #[test]
    fn test_failure_keeps_earlier_definitions() {
        let mut interpreter = interpreter();
        assert_eq!(
            eval_str(&mut interpreter, "(define x 1) (car (list)) (define y 2)"),
            Err(EvalError::NilAccess("car"))
        );
        assert_eq!(eval_str(&mut interpreter, "x"), Ok(n(1.0)));
        assert_eq!(eval_str(&mut interpreter, "y"), Err(EvalError::UnboundSymbol("y".to_string())));
    }

    #[test]
    fn test_pure_expressions_are_repeatable() {
        let mut interpreter = interpreter();
        eval_str(&mut interpreter, "(define xs (list 3 1 2))").unwrap();
        let source = "(let ((h (car xs))) (cons h (cdr xs)))";
        let first = eval_str(&mut interpreter, source);
        for _ in 0..3 {
            assert_eq!(eval_str(&mut interpreter, source), first);
        }
    }

    #[test]
    fn test_malformed_nodes() {
        let mut interpreter = interpreter();
        let global = interpreter.global().clone();
        let params = Node::branch(NodeKind::Params, vec![]);
        assert_eq!(
            interpreter.evaluate(&params, &global),
            Err(EvalError::Malformed(NodeKind::Params))
        );
        let empty_if = Node::branch(NodeKind::If, vec![]);
        assert_eq!(
            interpreter.evaluate(&empty_if, &global),
            Err(EvalError::Malformed(NodeKind::If))
        );
    }
}
