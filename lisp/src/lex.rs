use derive_more::Display;
use logos::Logos;
use serde_derive::Serialize;
use thiserror::Error;

/// Words that lex as [`TokenKind::ReservedWord`] instead of [`TokenKind::Symbol`].
/// Only the special forms among them change how the parser reads a list.
pub const RESERVED_WORDS: [&str; 16] = [
    "defun", "define", "lambda", "if", "cond", "let", "setq", "quote", "progn", "loop", "return",
    "car", "cdr", "cons", "list", "eval",
];

// Logos picks the longest match, then the highest priority. The patterns are
// shaped so that this agrees with trying them in declaration order: a symbol
// may start with `-` but never with `-` followed by a digit, and priorities
// follow number > symbol > operator.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum RawToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r"[-+]?[0-9]+(\.[0-9]+)?", priority = 4)]
    Number,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"[A-Za-z?!*][A-Za-z0-9?!*\-]*", priority = 3)]
    #[regex(r"-([A-Za-z?!*\-][A-Za-z0-9?!*\-]*)?", priority = 3)]
    Symbol,
    #[regex(r"[+\-*/<>=]", priority = 2)]
    Operator,

    #[error]
    #[regex(r";[^\n]*", logos::skip)]
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Error,
}

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum TokenKind {
    #[display(fmt = "`(`")]
    OpenParen,
    #[display(fmt = "`)`")]
    CloseParen,
    #[display(fmt = "number")]
    Number,
    #[display(fmt = "string")]
    String,
    #[display(fmt = "symbol")]
    Symbol,
    #[display(fmt = "reserved word")]
    ReservedWord,
    #[display(fmt = "operator")]
    Operator,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    /// Byte offset of `lexeme` in the source.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, offset: usize) -> Self {
        Token {
            kind,
            lexeme,
            offset,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("unrecognized input at offset {offset}: `{fragment}`")]
pub struct LexError {
    pub offset: usize,
    pub fragment: String,
}

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Split `source` into tokens, dropping comments and whitespace.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();
    while let Some(raw) = lexer.next() {
        let lexeme = lexer.slice();
        let offset = lexer.span().start;
        let kind = match raw {
            RawToken::LParen => TokenKind::OpenParen,
            RawToken::RParen => TokenKind::CloseParen,
            RawToken::Number => TokenKind::Number,
            RawToken::Str => TokenKind::String,
            RawToken::Symbol if is_reserved(lexeme) => TokenKind::ReservedWord,
            RawToken::Symbol => TokenKind::Symbol,
            RawToken::Operator => TokenKind::Operator,
            RawToken::Error => {
                return Err(LexError {
                    offset,
                    fragment: lexeme.to_string(),
                })
            },
        };
        tokens.push(Token::new(kind, lexeme, offset));
    }
    log::debug!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}

/// Outcome of [`check_parentheses`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParenCheck {
    Balanced,
    /// A `)` at `offset` closed more lists than were open.
    ExcessClose { offset: usize },
    /// Input ended with `depth` lists still open. There is no single offset to
    /// blame here, so none is reported.
    Unclosed { depth: usize },
}

impl ParenCheck {
    pub fn is_balanced(&self) -> bool {
        matches!(self, ParenCheck::Balanced)
    }

    pub fn error_offset(&self) -> Option<usize> {
        match self {
            ParenCheck::ExcessClose { offset } => Some(*offset),
            _ => None,
        }
    }
}

/// Count parentheses without tokenizing. Parens inside strings and comments
/// are counted too.
pub fn check_parentheses(source: &str) -> ParenCheck {
    let mut depth = 0usize;
    for (offset, c) in source.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return ParenCheck::ExcessClose { offset },
            ')' => depth -= 1,
            _ => {},
        }
    }
    if depth == 0 {
        ParenCheck::Balanced
    } else {
        ParenCheck::Unclosed { depth }
    }
}
