//! Lexer for the remap language.
//!
//! Turns program text into a token stream terminated by [`TokenKind::Eof`].
//! Lexical errors do not stop the scan: each one is recorded as a diagnostic,
//! the rest of the statement is skipped and replaced by a single
//! [`TokenKind::Invalid`] token, and lexing resumes at the next statement
//! boundary.

use super::token::{Token, TokenKind};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};
use crate::value::{FieldPath, Segment};
use chrono::DateTime;

/// A problem found while scanning one token.
struct LexError {
    code: DiagnosticCode,
    message: String,
    span: Span,
    label: &'static str,
}

/// Position snapshot used to build spans.
#[derive(Clone, Copy)]
struct Mark {
    index: usize,
    line: usize,
    column: usize,
}

/// Tokenizes `source`, returning the tokens and any lexical diagnostics.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).run()
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '@'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).map(|(_, c)| *c)
    }

    /// Byte offset of the current character.
    fn offset_of(&self, index: usize) -> usize {
        self.chars
            .get(index)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn mark(&self) -> Mark {
        Mark {
            index: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(
            self.offset_of(mark.index),
            self.offset_of(self.index),
            mark.line,
            mark.column,
        )
    }

    fn error(
        &self,
        code: DiagnosticCode,
        message: impl Into<String>,
        mark: Mark,
        label: &'static str,
    ) -> LexError {
        LexError {
            code,
            message: message.into(),
            span: self.span_from(mark),
            label,
        }
    }

    fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        loop {
            self.skip_trivia();
            let start = self.mark();
            let Some(c) = self.peek() else {
                let span = self.span_from(start);
                self.tokens.push(Token::new(TokenKind::Eof, "", span));
                break;
            };

            let result = match c {
                '\n' => {
                    self.bump();
                    if matches!(
                        self.tokens.last().map(|t| &t.kind),
                        Some(TokenKind::Newline)
                    ) {
                        continue;
                    }
                    Ok(TokenKind::Newline)
                }
                '.' => self.lex_path(),
                '"' => self.lex_string().map(TokenKind::String),
                's' if self.peek_at(1) == Some('\'') => self.lex_raw_string(),
                't' if self.peek_at(1) == Some('\'') => self.lex_timestamp(),
                c if c.is_ascii_digit() => self.lex_number(),
                '-' if self.starts_signed_number() => self.lex_number(),
                c if is_ident_start(c) => Ok(self.lex_ident()),
                _ => self.lex_symbol(),
            };

            match result {
                Ok(kind) => self.push(kind, start),
                Err(err) => {
                    self.diagnostics.push(
                        Diagnostic::error(err.code, err.message, err.span).with_label(err.label),
                    );
                    self.recover();
                    self.push(TokenKind::Invalid, start);
                }
            }
        }
        (self.tokens, self.diagnostics)
    }

    fn push(&mut self, kind: TokenKind, start: Mark) {
        let span = self.span_from(start);
        let lexeme = &self.source[span.start..span.end];
        self.tokens.push(Token::new(kind, lexeme, span));
    }

    /// Skips spaces and comments, but not newlines.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => {
                    while matches!(self.peek(), Some(c) if c != '\n') {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Skips to the next statement boundary without consuming it. A `}` that
    /// closes a block opened before the error also ends the statement, and
    /// quoted text is skipped whole so braces inside it do not count.
    fn recover(&mut self) {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '\n' | ';' if depth == 0 => break,
                '}' if depth == 0 => break,
                '{' => depth += 1,
                '}' => depth -= 1,
                '"' | '\'' => {
                    self.skip_quoted(c);
                    continue;
                }
                '#' => {
                    self.skip_trivia();
                    continue;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips a quoted run up to and including its closing `quote`.
    fn skip_quoted(&mut self, quote: char) {
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                c if c == quote => return,
                _ => {}
            }
        }
    }

    fn lex_path(&mut self) -> Result<TokenKind, LexError> {
        self.bump();
        let mut path = FieldPath::root();

        match self.peek() {
            Some(c) if is_key_char(c) => path.push(Segment::Key(self.read_key())),
            Some('"') => path.push(Segment::Key(self.lex_string()?)),
            _ => return Ok(TokenKind::Path(path)),
        }

        loop {
            match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (Some('.'), Some(c), _) if is_key_char(c) => {
                    self.bump();
                    path.push(Segment::Key(self.read_key()));
                }
                (Some('.'), Some('"'), _) => {
                    self.bump();
                    path.push(Segment::Key(self.lex_string()?));
                }
                (Some('['), Some(c), _) if c.is_ascii_digit() => {
                    path.push(Segment::Index(self.read_index()?));
                }
                (Some('['), Some('-'), Some(c)) if c.is_ascii_digit() => {
                    path.push(Segment::Index(self.read_index()?));
                }
                _ => break,
            }
        }
        Ok(TokenKind::Path(path))
    }

    fn read_key(&mut self) -> String {
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if !is_key_char(c) {
                break;
            }
            key.push(c);
            self.bump();
        }
        key
    }

    fn read_index(&mut self) -> Result<isize, LexError> {
        let start = self.mark();
        self.bump();
        let mut digits = String::new();
        if self.peek() == Some('-') {
            digits.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.bump();
        }
        if self.peek() != Some(']') {
            return Err(self.error(
                DiagnosticCode::SyntaxError,
                "unterminated path index",
                start,
                "expected `]` after the index",
            ));
        }
        self.bump();
        digits.parse::<isize>().map_err(|_| {
            self.error(
                DiagnosticCode::InvalidNumber,
                format!("path index `{}` is out of range", digits),
                start,
                "index does not fit in a machine integer",
            )
        })
    }

    /// Reads a double-quoted string, decoding escapes.
    ///
    /// On an invalid escape the scan continues to the closing quote so the
    /// rest of the literal is not mistaken for code.
    fn lex_string(&mut self) -> Result<String, LexError> {
        let start = self.mark();
        self.bump();
        let mut out = String::new();
        let mut invalid: Option<LexError> = None;

        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(
                    DiagnosticCode::UnterminatedString,
                    "unterminated string literal",
                    start,
                    "string is never closed",
                ));
            };
            match c {
                '"' => {
                    self.bump();
                    break;
                }
                '\\' => {
                    let escape_start = self.mark();
                    self.bump();
                    match self.read_escape() {
                        Some(decoded) => out.push(decoded),
                        None => {
                            if invalid.is_none() {
                                invalid = Some(self.error(
                                    DiagnosticCode::InvalidEscape,
                                    "invalid escape sequence in string literal",
                                    escape_start,
                                    "unknown escape",
                                ));
                            }
                        }
                    }
                }
                _ => {
                    out.push(c);
                    self.bump();
                }
            }
        }

        match invalid {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }

    /// Decodes the escape after a backslash. Returns `None` if it is invalid.
    fn read_escape(&mut self) -> Option<char> {
        let c = self.peek()?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'u' => {
                self.bump();
                return self.read_unicode_escape();
            }
            '\n' => return None,
            _ => {
                self.bump();
                return None;
            }
        };
        self.bump();
        Some(decoded)
    }

    fn read_unicode_escape(&mut self) -> Option<char> {
        if self.peek() != Some('{') {
            return None;
        }
        self.bump();
        let mut hex = String::new();
        while let Some(c) = self.peek() {
            if c == '}' || hex.len() > 6 || !c.is_ascii_hexdigit() {
                break;
            }
            hex.push(c);
            self.bump();
        }
        if self.peek() != Some('}') {
            return None;
        }
        self.bump();
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    }

    fn lex_raw_string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.mark();
        self.bump();
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.error(
                        DiagnosticCode::UnterminatedString,
                        "unterminated raw string literal",
                        start,
                        "string is never closed",
                    ))
                }
                Some('\'') => {
                    self.bump();
                    break;
                }
                Some('\\') if self.peek_at(1) == Some('\'') => {
                    self.bump();
                    self.bump();
                    out.push('\'');
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokenKind::String(out))
    }

    fn lex_timestamp(&mut self) -> Result<TokenKind, LexError> {
        let start = self.mark();
        self.bump();
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(self.error(
                        DiagnosticCode::UnterminatedString,
                        "unterminated timestamp literal",
                        start,
                        "literal is never closed",
                    ))
                }
                Some('\'') => break,
                Some(c) => text.push(c),
            }
        }
        DateTime::parse_from_rfc3339(&text)
            .map(TokenKind::Timestamp)
            .map_err(|e| {
                self.error(
                    DiagnosticCode::InvalidTimestamp,
                    format!("invalid timestamp literal: {}", e),
                    start,
                    "expected an RFC 3339 timestamp",
                )
            })
    }

    /// A `-` glued to a digit is part of the literal unless the previous
    /// token ends an operand, in which case it is subtraction. This lets
    /// `-9223372036854775808` be written directly.
    fn starts_signed_number(&self) -> bool {
        if !matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            return false;
        }
        !matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(
                TokenKind::Path(_)
                    | TokenKind::Ident(_)
                    | TokenKind::String(_)
                    | TokenKind::Integer(_)
                    | TokenKind::Float(_)
                    | TokenKind::Timestamp(_)
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::Null
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Invalid
            )
        )
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.mark();
        let mut is_float = false;
        if self.peek() == Some('-') {
            self.bump();
        }
        self.eat_digits();

        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.eat_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_digits = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => matches!(self.peek_at(2), Some(c) if c.is_ascii_digit()),
                _ => false,
            };
            if exponent_digits {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.eat_digits();
            }
        }

        if matches!(self.peek(), Some(c) if is_key_char(c)) {
            while matches!(self.peek(), Some(c) if is_key_char(c)) {
                self.bump();
            }
            let span = self.span_from(start);
            return Err(self.error(
                DiagnosticCode::InvalidNumber,
                format!(
                    "invalid numeric literal `{}`",
                    &self.source[span.start..span.end]
                ),
                start,
                "not a valid number",
            ));
        }

        let span = self.span_from(start);
        let text = self.source[span.start..span.end].replace('_', "");
        if is_float {
            text.parse::<f64>().map(TokenKind::Float).map_err(|_| {
                self.error(
                    DiagnosticCode::InvalidNumber,
                    format!("invalid float literal `{}`", text),
                    start,
                    "not a valid float",
                )
            })
        } else {
            text.parse::<i64>().map(TokenKind::Integer).map_err(|_| {
                self.error(
                    DiagnosticCode::InvalidNumber,
                    format!("integer literal `{}` is out of range", text),
                    start,
                    "does not fit in a 64-bit signed integer",
                )
            })
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.bump();
        }
        match name.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(name),
        }
    }

    /// Whether a `!` at the current position directly follows a function name.
    fn at_abort_marker(&self) -> bool {
        let here = self.offset_of(self.index);
        let follows_ident = matches!(
            self.tokens.last(),
            Some(Token { kind: TokenKind::Ident(_), span, .. }) if span.end == here
        );
        follows_ident && self.peek_at(1) == Some('(')
    }

    fn lex_symbol(&mut self) -> Result<TokenKind, LexError> {
        let start = self.mark();
        let c = self.peek().unwrap_or('\0');
        let next = self.peek_at(1);

        let (kind, width) = match (c, next) {
            ('!', _) if self.at_abort_marker() => (TokenKind::AbortMarker, 1),
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('=', _) => (TokenKind::Assign, 1),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            _ => {
                self.bump();
                return Err(self.error(
                    DiagnosticCode::UnexpectedCharacter,
                    format!("unexpected character `{}`", c),
                    start,
                    "not valid here",
                ));
            }
        };
        for _ in 0..width {
            self.bump();
        }
        Ok(kind)
    }
}
