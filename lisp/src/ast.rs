use derive_more::Display;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// every top-level expression of one parse
    #[display(fmt = "PROGRAM")]
    Program,
    /// (f args ...), or ()
    #[display(fmt = "LIST")]
    List,
    /// (define name expr) / (defun name (params ...) body ...)
    #[display(fmt = "DEFINE")]
    Define,
    /// (lambda (params ...) body ...)
    #[display(fmt = "LAMBDA")]
    Lambda,
    /// (if cond then [else])
    #[display(fmt = "IF")]
    If,
    /// (cond clause ...)
    #[display(fmt = "COND")]
    Cond,
    /// (cond body ...) inside a `cond`
    #[display(fmt = "CLAUSE")]
    Clause,
    /// (let (binding ...) body ...)
    #[display(fmt = "LET")]
    Let,
    #[display(fmt = "BINDINGS")]
    Bindings,
    /// (name expr) inside a `let`
    #[display(fmt = "BINDING")]
    Binding,
    /// (setq name expr)
    #[display(fmt = "SETQ")]
    Setq,
    /// (quote expr)
    #[display(fmt = "QUOTE")]
    Quote,
    #[display(fmt = "PARAMS")]
    Params,
    #[display(fmt = "SYMBOL")]
    Symbol,
    #[display(fmt = "KEYWORD")]
    Keyword,
    #[display(fmt = "NUMBER")]
    Number,
    #[display(fmt = "STRING")]
    String,
    #[display(fmt = "OPERATOR")]
    Operator,
    #[display(fmt = "NIL")]
    Nil,
}

impl NodeKind {
    pub fn is_leaf(self) -> bool {
        use NodeKind::*;
        matches!(self, Symbol | Keyword | Number | String | Operator | Nil)
    }
}

/// A node of the syntax tree. Leaves carry their literal text and no
/// children; every other kind is described by its children alone.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    kind: NodeKind,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        debug_assert!(kind.is_leaf() && kind != NodeKind::Nil);
        Node {
            kind,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn nil() -> Self {
        Node {
            kind: NodeKind::Nil,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn branch(kind: NodeKind, children: Vec<Node>) -> Self {
        debug_assert!(!kind.is_leaf());
        Node {
            kind,
            text: None,
            children,
        }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Node::leaf(NodeKind::Symbol, name)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Literal text of a leaf; `None` for structural nodes and `Nil`.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Indented rendering of the tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, level: usize) {
        for _ in 0..level {
            out.push_str("  ");
        }
        let line = match &self.text {
            Some(text) => format!("{}: {}\n", self.kind, text),
            None => format!("{}\n", self.kind),
        };
        out.push_str(&line);
        for child in &self.children {
            child.dump_into(out, level + 1);
        }
    }
}
