//! Token definitions for the remap language.

use crate::diagnostic::Span;
use crate::value::FieldPath;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// The kind of a lexed token, with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A field path such as `.`, `.foo.bar[0]`
    Path(FieldPath),
    /// A function name
    Ident(String),
    /// `!` written directly between a function name and its `(`
    AbortMarker,

    String(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    True,
    False,
    Null,

    If,
    Else,

    Assign,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Newline,

    /// Source the lexer could not tokenize; already reported as a diagnostic
    Invalid,
    Eof,
}

impl TokenKind {
    /// Human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Path(path) => format!("field path `{}`", path),
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::AbortMarker => "`!`".to_string(),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Integer(_) => "integer literal".to_string(),
            TokenKind::Float(_) => "float literal".to_string(),
            TokenKind::Timestamp(_) => "timestamp literal".to_string(),
            TokenKind::True | TokenKind::False => "boolean literal".to_string(),
            TokenKind::Null => "`null`".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Invalid => "invalid token".to_string(),
            TokenKind::Eof => "end of program".to_string(),
            other => format!("`{}`", other),
        }
    }

    /// Returns true for tokens that end a statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Path(path) => return write!(f, "{}", path),
            TokenKind::Ident(name) => return write!(f, "{}", name),
            TokenKind::String(s) => return write!(f, "{:?}", s),
            TokenKind::Integer(i) => return write!(f, "{}", i),
            TokenKind::Float(n) => return write!(f, "{:?}", n),
            TokenKind::Timestamp(ts) => return write!(f, "t'{}'", ts.to_rfc3339()),
            TokenKind::AbortMarker | TokenKind::Bang => "!",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Newline => "\\n",
            TokenKind::Invalid => "<invalid>",
            TokenKind::Eof => "<eof>",
        };
        f.write_str(text)
    }
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the token
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}
