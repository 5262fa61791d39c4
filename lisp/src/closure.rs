use crate::ast::Node;
use crate::config::ClosureCapture;
use crate::interpret::{EvalError, EvalResult};
use crate::symtab::Env;
use crate::value::Value;

/// A user function together with the environment it was created in.
#[derive(Debug)]
pub struct Closure {
    /// `None` for an anonymous `lambda`
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    /// Local scopes visible where the closure was built. Globals are not part
    /// of it; the interpreter resolves them separately.
    pub env: Env,
    pub capture: ClosureCapture,
}

impl Closure {
    pub fn new(
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Node>,
        env: Env,
        capture: ClosureCapture,
    ) -> Self {
        Closure {
            name,
            params,
            body,
            env,
            capture,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("lambda")
    }

    /// Frame for one call, holding the arguments under the parameter names.
    /// A linked closure forks its captured scopes; a snapshot closure forks a
    /// private copy of them, so no call sees another call's writes.
    pub fn bind_args(&self, args: Vec<Value>) -> EvalResult<Env> {
        if args.len() != self.params.len() {
            return Err(EvalError::ArityOrType(format!(
                "`{}` expects {} argument(s), got {}",
                self.display_name(),
                self.params.len(),
                args.len()
            )));
        }
        let frame = match self.capture {
            ClosureCapture::Linked => self.env.fork(),
            ClosureCapture::Snapshot => self.env.snapshot().fork(),
        };
        for (param, arg) in self.params.iter().zip(args) {
            frame.insert(param.as_str(), arg);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_args() {
        let env = Env::new();
        env.insert("outer", Value::Number(1.0));
        let closure = Closure::new(
            Some("f".to_string()),
            vec!["a".to_string(), "b".to_string()],
            vec![],
            env.clone(),
            ClosureCapture::Linked,
        );

        let frame = closure.bind_args(vec![Value::Number(2.0), Value::Nil]).unwrap();
        assert_eq!(frame.get("a"), Some(Value::Number(2.0)));
        assert_eq!(frame.get("b"), Some(Value::Nil));
        assert_eq!(frame.get("outer"), Some(Value::Number(1.0)));
        assert!(frame.parent().unwrap().ptr_eq(&env));
        assert!(!env.contains_key("a"));
    }

    #[test]
    fn test_bind_args_arity() {
        let closure = Closure::new(
            None,
            vec!["x".to_string()],
            vec![],
            Env::new(),
            ClosureCapture::Linked,
        );
        let err = closure.bind_args(vec![]).unwrap_err();
        assert_eq!(
            err,
            EvalError::ArityOrType("`lambda` expects 1 argument(s), got 0".to_string())
        );
    }

    #[test]
    fn test_snapshot_calls_get_private_copies() {
        let env = Env::new();
        env.insert("n", Value::Number(0.0));
        let closure = Closure::new(None, vec![], vec![], env.clone(), ClosureCapture::Snapshot);

        let first = closure.bind_args(vec![]).unwrap();
        assert_eq!(first.assign("n", Value::Number(1.0)), Ok(()));
        let second = closure.bind_args(vec![]).unwrap();
        assert_eq!(second.get("n"), Some(Value::Number(0.0)));
        assert_eq!(env.get("n"), Some(Value::Number(0.0)));
        assert!(!second.parent().unwrap().ptr_eq(&env));
    }
}
