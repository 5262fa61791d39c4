use thiserror::Error;

use crate::ast::{Node, NodeKind};
use crate::lex::{Token, TokenKind};

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("unexpected closing paren at offset {offset}")]
    UnexpectedCloseParen { offset: usize },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("expected {expected} at offset {offset}, found `{found}`")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Build the syntax tree for a whole token stream. No tokens gives a `Nil`
/// node, anything else a `Program` holding each top-level expression.
pub fn parse(tokens: &[Token<'_>]) -> ParseResult<Node> {
    if tokens.is_empty() {
        return Ok(Node::nil());
    }
    let mut parser = Parser::new(tokens);
    let mut program = Vec::new();
    while parser.peek().is_some() {
        program.push(parser.parse_expression()?);
    }
    log::debug!("parsed {} top-level expressions", program.len());
    Ok(Node::branch(NodeKind::Program, program))
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_close(&self) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::CloseParen)
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<&'t Token<'a>> {
        match self.next_token() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(unexpected(token, expected)),
            None => Err(ParseError::UnexpectedEof { expected }),
        }
    }

    fn expect_close(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::CloseParen, "`)`").map(|_| ())
    }

    fn parse_expression(&mut self) -> ParseResult<Node> {
        let token = self.next_token().ok_or(ParseError::UnexpectedEof {
            expected: "an expression",
        })?;
        match token.kind {
            TokenKind::Number => Ok(Node::leaf(NodeKind::Number, token.lexeme)),
            TokenKind::String => Ok(Node::leaf(NodeKind::String, unescape(token.lexeme))),
            TokenKind::Symbol => Ok(Node::leaf(NodeKind::Symbol, token.lexeme)),
            TokenKind::ReservedWord => Ok(Node::leaf(NodeKind::Keyword, token.lexeme)),
            TokenKind::Operator => Ok(Node::leaf(NodeKind::Operator, token.lexeme)),
            TokenKind::OpenParen => self.parse_list(),
            TokenKind::CloseParen => Err(ParseError::UnexpectedCloseParen {
                offset: token.offset,
            }),
        }
    }

    /// An expression that must be present, i.e. not the closing paren of the
    /// enclosing form.
    fn parse_required(&mut self, expected: &'static str) -> ParseResult<Node> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::CloseParen => Err(unexpected(token, expected)),
            _ => self.parse_expression(),
        }
    }

    /// Expressions up to and including the next `)` at this level.
    fn parse_until_close(&mut self) -> ParseResult<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(token) if token.kind == TokenKind::CloseParen => {
                    self.pos += 1;
                    return Ok(items);
                },
                Some(_) => items.push(self.parse_expression()?),
                None => return Err(ParseError::UnexpectedEof { expected: "`)`" }),
            }
        }
    }

    /// Like `parse_until_close`, but at least one expression.
    fn parse_body(&mut self, expected: &'static str) -> ParseResult<Vec<Node>> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::CloseParen => Err(unexpected(token, expected)),
            _ => self.parse_until_close(),
        }
    }

    // the opening paren is already consumed
    fn parse_list(&mut self) -> ParseResult<Node> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::CloseParen => {
                self.pos += 1;
                return Ok(Node::branch(NodeKind::List, Vec::new()));
            },
            Some(token) if token.kind == TokenKind::ReservedWord => {
                let keyword = token.lexeme;
                let special: Option<fn(&mut Self, &str) -> ParseResult<Node>> = match keyword {
                    "define" | "defun" => Some(Self::parse_define),
                    "lambda" => Some(Self::parse_lambda),
                    "if" => Some(Self::parse_if),
                    "cond" => Some(Self::parse_cond),
                    "let" => Some(Self::parse_let),
                    "setq" => Some(Self::parse_setq),
                    "quote" => Some(Self::parse_quote),
                    _ => None,
                };
                if let Some(parse_form) = special {
                    self.pos += 1;
                    return parse_form(self, keyword);
                }
            },
            _ => {},
        }
        let items = self.parse_until_close()?;
        Ok(Node::branch(NodeKind::List, items))
    }

    fn parse_params(&mut self) -> ParseResult<Node> {
        self.expect(TokenKind::OpenParen, "a parameter list")?;
        let mut params = Vec::new();
        loop {
            match self.next_token() {
                Some(token) if token.kind == TokenKind::CloseParen => break,
                Some(token) if token.kind == TokenKind::Symbol => params.push(Node::symbol(token.lexeme)),
                Some(token) => return Err(unexpected(token, "a parameter symbol")),
                None => return Err(ParseError::UnexpectedEof { expected: "`)`" }),
            }
        }
        Ok(Node::branch(NodeKind::Params, params))
    }

    /// (define name expr) or (defun name (params ...) body ...)
    fn parse_define(&mut self, keyword: &str) -> ParseResult<Node> {
        let name = self.expect(TokenKind::Symbol, "a symbol to define")?;
        let mut children = vec![Node::leaf(NodeKind::Keyword, keyword), Node::symbol(name.lexeme)];
        if keyword == "defun" {
            children.push(self.parse_params()?);
            children.extend(self.parse_until_close()?);
        } else {
            children.push(self.parse_required("a value expression")?);
            self.expect_close()?;
        }
        Ok(Node::branch(NodeKind::Define, children))
    }

    /// (lambda (params ...) body ...)
    fn parse_lambda(&mut self, _: &str) -> ParseResult<Node> {
        let mut children = vec![self.parse_params()?];
        children.extend(self.parse_body("a lambda body")?);
        Ok(Node::branch(NodeKind::Lambda, children))
    }

    /// (if cond then [else])
    fn parse_if(&mut self, _: &str) -> ParseResult<Node> {
        let mut children = vec![
            self.parse_required("a condition")?,
            self.parse_required("a then branch")?,
        ];
        if !self.at_close() {
            children.push(self.parse_expression()?);
        }
        self.expect_close()?;
        Ok(Node::branch(NodeKind::If, children))
    }

    /// (cond (test body ...) ...)
    fn parse_cond(&mut self, _: &str) -> ParseResult<Node> {
        let mut clauses = Vec::new();
        loop {
            match self.next_token() {
                Some(token) if token.kind == TokenKind::CloseParen => break,
                Some(token) if token.kind == TokenKind::OpenParen => {
                    let mut clause = vec![self.parse_required("a clause condition")?];
                    clause.extend(self.parse_until_close()?);
                    clauses.push(Node::branch(NodeKind::Clause, clause));
                },
                Some(token) => return Err(unexpected(token, "a cond clause")),
                None => return Err(ParseError::UnexpectedEof { expected: "`)`" }),
            }
        }
        Ok(Node::branch(NodeKind::Cond, clauses))
    }

    /// (let ((name expr) ...) body ...)
    fn parse_let(&mut self, _: &str) -> ParseResult<Node> {
        self.expect(TokenKind::OpenParen, "a binding list")?;
        let mut bindings = Vec::new();
        loop {
            match self.next_token() {
                Some(token) if token.kind == TokenKind::CloseParen => break,
                Some(token) if token.kind == TokenKind::OpenParen => {
                    let name = self.expect(TokenKind::Symbol, "a symbol to bind")?;
                    let value = self.parse_required("a value expression")?;
                    self.expect_close()?;
                    bindings.push(Node::branch(NodeKind::Binding, vec![Node::symbol(name.lexeme), value]));
                },
                Some(token) => return Err(unexpected(token, "a binding")),
                None => return Err(ParseError::UnexpectedEof { expected: "`)`" }),
            }
        }
        let mut children = vec![Node::branch(NodeKind::Bindings, bindings)];
        children.extend(self.parse_body("a let body")?);
        Ok(Node::branch(NodeKind::Let, children))
    }

    /// (setq name expr)
    fn parse_setq(&mut self, _: &str) -> ParseResult<Node> {
        let name = self.expect(TokenKind::Symbol, "a symbol to assign")?;
        let value = self.parse_required("a value expression")?;
        self.expect_close()?;
        Ok(Node::branch(NodeKind::Setq, vec![Node::symbol(name.lexeme), value]))
    }

    /// (quote expr)
    fn parse_quote(&mut self, _: &str) -> ParseResult<Node> {
        let quoted = self.parse_required("an expression to quote")?;
        self.expect_close()?;
        Ok(Node::branch(NodeKind::Quote, vec![quoted]))
    }
}

fn unexpected(token: &Token<'_>, expected: &'static str) -> ParseError {
    ParseError::Expected {
        expected,
        found: token.lexeme.to_string(),
        offset: token.offset,
    }
}

/// Strip the quotes off a string literal and resolve its escapes.
fn unescape(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
