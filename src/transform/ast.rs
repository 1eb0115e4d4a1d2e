//! Abstract Syntax Tree (AST) definitions for the remap language.
//!
//! The AST is the unresolved output of the parser. Function names are still
//! plain strings here; the compiler resolves them against the built-in
//! library and lowers the tree into a [`Program`](super::program::Program).

use crate::diagnostic::Span;
use crate::value::FieldPath;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// An expression together with the source region it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every construct of the language is an expression; statements are
/// expressions evaluated for their effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value, possibly containing nested expressions
    Literal(Literal),
    /// A field path read
    Path(PathExpr),
    /// A single- or two-target assignment
    Assignment(Box<Assignment>),
    /// A built-in function call
    FunctionCall(FunctionCall),
    /// A binary operation
    BinaryOp {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    /// A unary operation
    UnaryOp {
        operator: UnaryOperator,
        expr: Box<Expr>,
    },
    /// `if` with optional `else` / `else if` chain
    If(IfExpr),
    /// A braced sequence of expressions
    Block(Block),
    /// `del(<path>)`
    Del(Del),
}

/// Literal syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `{"key": value}`
    Object(Vec<(String, Expr)>),
}

/// What a field path is applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum PathTarget {
    /// The event root (`.foo`)
    Root,
    /// The result of another expression (`parse_json!(.m).foo`)
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub target: PathTarget,
    pub path: FieldPath,
}

/// An assignable location: always a path from the event root.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub path: FieldPath,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `.target = expr`
    Single { target: Target, expr: Expr },
    /// `.ok, .err = expr`
    Fallible { ok: Target, err: Target, expr: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub name_span: Span,
    /// Set when the call was written `name!(...)`
    pub abort_on_error: bool,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub consequent: Block,
    /// Either another `If` expression or a `Block`
    pub alternative: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Del {
    pub target: Target,
    pub abort_on_error: bool,
}

/// Represents a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Addition or string concatenation (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Remainder (%)
    Remainder,
    /// Equality (==)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Represents a unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Negation (-)
    Negate,
    /// Logical NOT (!)
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}
