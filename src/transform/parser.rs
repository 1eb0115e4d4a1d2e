//! Recursive-descent parser for the remap language.
//!
//! Statements are parsed top-down; binary expressions use precedence
//! climbing over [`Precedence`]. Syntax errors never abort the parse: each one
//! is recorded as a diagnostic, the parser skips to the next statement
//! boundary and carries on, so one pass reports every problem it can find.

use super::ast::{
    Assignment, BinaryOperator, Block, Del, Expr, ExprKind, FunctionCall, IfExpr, Literal,
    PathExpr, PathTarget, Target, UnaryOperator,
};
use super::token::{Token, TokenKind};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};
use crate::value::{FieldPath, Segment};

/// Precedence levels (higher binds tighter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `== != < <= > >=`
    Comparison,
    /// `+ -`
    Sum,
    /// `* / %`
    Product,
    /// Unary `-` and `!`
    Prefix,
}

impl Precedence {
    /// Binary operator and precedence for an infix token.
    pub fn for_token(kind: &TokenKind) -> Option<(BinaryOperator, Precedence)> {
        let entry = match kind {
            TokenKind::OrOr => (BinaryOperator::Or, Precedence::Or),
            TokenKind::AndAnd => (BinaryOperator::And, Precedence::And),
            TokenKind::Eq => (BinaryOperator::Equal, Precedence::Comparison),
            TokenKind::NotEq => (BinaryOperator::NotEqual, Precedence::Comparison),
            TokenKind::Lt => (BinaryOperator::LessThan, Precedence::Comparison),
            TokenKind::LtEq => (BinaryOperator::LessThanOrEqual, Precedence::Comparison),
            TokenKind::Gt => (BinaryOperator::GreaterThan, Precedence::Comparison),
            TokenKind::GtEq => (BinaryOperator::GreaterThanOrEqual, Precedence::Comparison),
            TokenKind::Plus => (BinaryOperator::Add, Precedence::Sum),
            TokenKind::Minus => (BinaryOperator::Subtract, Precedence::Sum),
            TokenKind::Star => (BinaryOperator::Multiply, Precedence::Product),
            TokenKind::Slash => (BinaryOperator::Divide, Precedence::Product),
            TokenKind::Percent => (BinaryOperator::Remainder, Precedence::Product),
            _ => return None,
        };
        Some(entry)
    }
}

/// The current statement was abandoned; a diagnostic has already been
/// recorded (or the offending token was an already-reported lexer error).
#[derive(Debug)]
struct Abandoned;

type ParseResult<T> = Result<T, Abandoned>;

/// Parses a token stream into top-level statements plus syntax diagnostics.
pub fn parse(tokens: Vec<Token>) -> (Vec<Expr>, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse_program();
    (statements, parser.diagnostics)
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or_default();
            let eof_span = Span::new(end.end, end.end, end.line, end.column);
            tokens.push(Token::new(TokenKind::Eof, "", eof_span));
        }
        Self {
            tokens,
            position: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse_program(&mut self) -> Vec<Expr> {
        self.parse_statements(false)
    }

    // Token cursor

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    fn peek_kind(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + n).min(last)].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Semicolon
        ) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.at(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Records a syntax error at the current token.
    fn unexpected(&mut self, expected: &str) -> Abandoned {
        let token = self.current().clone();
        if token.kind != TokenKind::Invalid {
            self.diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::SyntaxError,
                    format!("unexpected {}, expected {}", token.kind.describe(), expected),
                    token.span,
                )
                .with_label(format!("expected {}", expected)),
            );
        }
        Abandoned
    }

    fn report(&mut self, code: DiagnosticCode, message: String, span: Span, label: &str) {
        self.diagnostics
            .push(Diagnostic::error(code, message, span).with_label(label));
    }

    /// Skips to the next statement boundary. Braces opened while skipping are
    /// matched; an unmatched `}` ends the enclosing block and is left for it.
    fn synchronize(&mut self, in_block: bool) {
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => return,
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => {
                    if !in_block {
                        self.advance();
                    }
                    return;
                }
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    // Statements

    fn parse_statements(&mut self, in_block: bool) -> Vec<Expr> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            match self.current().kind {
                TokenKind::Eof => break,
                TokenKind::RBrace if in_block => break,
                TokenKind::RBrace => {
                    let span = self.current().span;
                    self.report(
                        DiagnosticCode::SyntaxError,
                        "unexpected `}` with no open block".to_string(),
                        span,
                        "unmatched closing brace",
                    );
                    self.advance();
                    continue;
                }
                _ => {}
            }

            match self.parse_statement() {
                Ok(statement) => {
                    statements.push(statement);
                    let kind = &self.current().kind;
                    let at_end =
                        kind.is_terminator() || (in_block && *kind == TokenKind::RBrace);
                    if !at_end {
                        self.unexpected("end of statement");
                        self.synchronize(in_block);
                    }
                }
                Err(Abandoned) => self.synchronize(in_block),
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> ParseResult<Expr> {
        if let TokenKind::Path(_) = self.current().kind {
            match (self.peek_kind(1), self.peek_kind(2), self.peek_kind(3)) {
                (TokenKind::Assign, _, _) => return self.parse_assignment(),
                (TokenKind::Comma, TokenKind::Path(_), TokenKind::Assign) => {
                    return self.parse_fallible_assignment()
                }
                _ => {}
            }
        }
        self.parse_expression(Precedence::Lowest)
    }

    fn parse_target(&mut self) -> ParseResult<Target> {
        match self.current().kind.clone() {
            TokenKind::Path(path) => {
                let span = self.advance().span;
                Ok(Target { path, span })
            }
            _ => Err(self.unexpected("field path")),
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let target = self.parse_target()?;
        self.expect(TokenKind::Assign, "`=`")?;
        self.skip_newlines();
        let expr = self.parse_expression(Precedence::Lowest)?;
        let span = target.span.to(expr.span);
        Ok(Expr::new(
            ExprKind::Assignment(Box::new(Assignment::Single { target, expr })),
            span,
        ))
    }

    fn parse_fallible_assignment(&mut self) -> ParseResult<Expr> {
        let ok = self.parse_target()?;
        self.expect(TokenKind::Comma, "`,`")?;
        let err = self.parse_target()?;
        self.expect(TokenKind::Assign, "`=`")?;
        self.skip_newlines();
        let expr = self.parse_expression(Precedence::Lowest)?;
        let span = ok.span.to(expr.span);
        Ok(Expr::new(
            ExprKind::Assignment(Box::new(Assignment::Fallible { ok, err, expr })),
            span,
        ))
    }

    // Expressions

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while let Some((operator, next)) = Precedence::for_token(&self.current().kind) {
            if next <= precedence {
                break;
            }
            self.advance();
            self.skip_newlines();
            let right = self.parse_expression(next)?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::BinaryOp {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let operator = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang => UnaryOperator::Not,
            // A path token already carries its own segments.
            TokenKind::Path(_) => return self.parse_primary(),
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        let start = self.advance().span;
        let operand = self.parse_expression(Precedence::Prefix)?;
        let span = start.to(operand.span);

        // Fold negative numeric literals so `-5` is a plain constant.
        if operator == UnaryOperator::Negate {
            match operand.kind {
                ExprKind::Literal(Literal::Integer(i)) if i.checked_neg().is_some() => {
                    return Ok(Expr::new(ExprKind::Literal(Literal::Integer(-i)), span));
                }
                ExprKind::Literal(Literal::Float(f)) => {
                    return Ok(Expr::new(ExprKind::Literal(Literal::Float(-f)), span));
                }
                _ => {}
            }
        }

        Ok(Expr::new(
            ExprKind::UnaryOp {
                operator,
                expr: Box::new(operand),
            },
            span,
        ))
    }

    /// Applies `.key` / `[n]` chains written directly after a non-path
    /// primary, e.g. `parse_json!(.message).status` or `(.a).b`.
    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            let token = self.current().clone();
            if token.span.start != expr.span.end {
                break;
            }
            let path = match token.kind {
                TokenKind::Path(ref path) if !path.is_root() => {
                    self.advance();
                    path.clone()
                }
                TokenKind::LBracket => {
                    let index = self.parse_index_suffix()?;
                    FieldPath::new(vec![Segment::Index(index)])
                }
                _ => break,
            };
            let span = expr.span.to(self.tokens[self.position - 1].span);
            expr = Expr::new(
                ExprKind::Path(PathExpr {
                    target: PathTarget::Expr(Box::new(expr)),
                    path,
                }),
                span,
            );
        }
        Ok(expr)
    }

    fn parse_index_suffix(&mut self) -> ParseResult<isize> {
        self.expect(TokenKind::LBracket, "`[`")?;
        let negative = if self.at(&TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };
        let token = self.current().clone();
        let TokenKind::Integer(value) = token.kind else {
            return Err(self.unexpected("integer index"));
        };
        self.advance();
        self.expect(TokenKind::RBracket, "`]`")?;
        let value = if negative { -value } else { value };
        isize::try_from(value).map_err(|_| {
            self.report(
                DiagnosticCode::InvalidNumber,
                format!("index `{}` is out of range", value),
                token.span,
                "index does not fit in a machine integer",
            );
            Abandoned
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        let literal = match token.kind {
            TokenKind::Path(path) => {
                self.advance();
                return Ok(Expr::new(
                    ExprKind::Path(PathExpr {
                        target: PathTarget::Root,
                        path,
                    }),
                    token.span,
                ));
            }
            TokenKind::Null => Literal::Null,
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Integer(i) => Literal::Integer(i),
            TokenKind::Float(f) => Literal::Float(f),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::Timestamp(ts) => Literal::Timestamp(ts),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => {
                return if self.brace_starts_object() {
                    self.parse_object()
                } else {
                    let (block, span) = self.parse_block()?;
                    Ok(Expr::new(ExprKind::Block(block), span))
                };
            }
            TokenKind::LParen => return self.parse_group(),
            TokenKind::If => return self.parse_if(),
            TokenKind::Ident(name) if name == "del" => return self.parse_del(),
            TokenKind::Ident(_) => return self.parse_function_call(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expr::new(ExprKind::Literal(literal), token.span))
    }

    fn parse_group(&mut self) -> ParseResult<Expr> {
        let open = self.advance().span;
        self.skip_newlines();
        let mut inner = self.parse_expression(Precedence::Lowest)?;
        self.skip_newlines();
        let close = self.expect(TokenKind::RParen, "`)`")?;
        inner.span = open.to(close.span);
        Ok(inner)
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let open = self.advance().span;
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_newlines();
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(&TokenKind::RBracket) {
                return Err(self.unexpected("`,` or `]`"));
            }
        }
        let close = self.advance().span;
        Ok(Expr::new(
            ExprKind::Literal(Literal::Array(items)),
            open.to(close),
        ))
    }

    /// `{}` and `{ "key": ...` start object literals; any other `{` opens a block.
    fn brace_starts_object(&self) -> bool {
        let mut n = 1;
        while *self.peek_kind(n) == TokenKind::Newline {
            n += 1;
        }
        match self.peek_kind(n) {
            TokenKind::RBrace => true,
            TokenKind::String(_) => *self.peek_kind(n + 1) == TokenKind::Colon,
            _ => false,
        }
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        let open = self.advance().span;
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let key = match self.current().kind.clone() {
                TokenKind::String(key) => {
                    self.advance();
                    key
                }
                _ => return Err(self.unexpected("string key")),
            };
            self.expect(TokenKind::Colon, "`:`")?;
            self.skip_newlines();
            let value = self.parse_expression(Precedence::Lowest)?;
            entries.push((key, value));
            self.skip_newlines();
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(&TokenKind::RBrace) {
                return Err(self.unexpected("`,` or `}`"));
            }
        }
        let close = self.advance().span;
        Ok(Expr::new(
            ExprKind::Literal(Literal::Object(entries)),
            open.to(close),
        ))
    }

    fn parse_block(&mut self) -> ParseResult<(Block, Span)> {
        let open = self.expect(TokenKind::LBrace, "`{`")?.span;
        let statements = self.parse_statements(true);
        if !self.at(&TokenKind::RBrace) {
            self.report(
                DiagnosticCode::SyntaxError,
                "unclosed block".to_string(),
                open,
                "this `{` is never closed",
            );
            return Err(Abandoned);
        }
        let close = self.advance().span;
        Ok((Block { statements }, open.to(close)))
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span;
        let condition = self.parse_expression(Precedence::Lowest)?;
        let (consequent, mut span) = self.parse_block()?;
        span = start.to(span);

        // `else` may sit on a following line.
        let save = self.position;
        self.skip_newlines();
        let alternative = if self.at(&TokenKind::Else) {
            self.advance();
            let alternative = if self.at(&TokenKind::If) {
                self.parse_if()?
            } else {
                let (block, block_span) = self.parse_block()?;
                Expr::new(ExprKind::Block(block), block_span)
            };
            span = span.to(alternative.span);
            Some(Box::new(alternative))
        } else {
            self.position = save;
            None
        };

        Ok(Expr::new(
            ExprKind::If(IfExpr {
                condition: Box::new(condition),
                consequent,
                alternative,
            }),
            span,
        ))
    }

    /// Parses `name(...)` or `name!(...)`; returns the call and closing span.
    fn parse_call_parts(&mut self) -> ParseResult<(FunctionCall, Span)> {
        let name_token = self.advance();
        let TokenKind::Ident(name) = name_token.kind else {
            return Err(self.unexpected("function name"));
        };
        let abort_on_error = if self.at(&TokenKind::AbortMarker) {
            self.advance();
            true
        } else {
            false
        };
        if !self.at(&TokenKind::LParen) {
            let span = name_token.span;
            self.report(
                DiagnosticCode::SyntaxError,
                format!("unexpected identifier `{}`", name),
                span,
                "bare identifiers are not supported; expected a function call",
            );
            return Err(Abandoned);
        }
        self.advance();

        let mut arguments = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(&TokenKind::RParen) {
                break;
            }
            arguments.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_newlines();
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(&TokenKind::RParen) {
                return Err(self.unexpected("`,` or `)`"));
            }
        }
        let close = self.advance().span;
        Ok((
            FunctionCall {
                name,
                name_span: name_token.span,
                abort_on_error,
                arguments,
            },
            name_token.span.to(close),
        ))
    }

    fn parse_function_call(&mut self) -> ParseResult<Expr> {
        let (call, span) = self.parse_call_parts()?;
        Ok(Expr::new(ExprKind::FunctionCall(call), span))
    }

    fn parse_del(&mut self) -> ParseResult<Expr> {
        let (call, span) = self.parse_call_parts()?;
        if call.arguments.len() != 1 {
            self.report(
                DiagnosticCode::ArityMismatch,
                format!(
                    "function `del` takes 1 argument but {} were supplied",
                    call.arguments.len()
                ),
                span,
                "expected a single field path",
            );
            return Err(Abandoned);
        }
        let argument = &call.arguments[0];
        let target = match &argument.kind {
            ExprKind::Path(PathExpr {
                target: PathTarget::Root,
                path,
            }) => Target {
                path: path.clone(),
                span: argument.span,
            },
            _ => {
                self.report(
                    DiagnosticCode::PathArgumentRequired,
                    "function `del` requires a field path argument".to_string(),
                    argument.span,
                    "expected a field path such as `.field`",
                );
                return Err(Abandoned);
            }
        };
        Ok(Expr::new(
            ExprKind::Del(Del {
                target,
                abort_on_error: call.abort_on_error,
            }),
            span,
        ))
    }
}
