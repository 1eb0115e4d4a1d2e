//! The compiled, executable form of a remap program.
//!
//! A [`Program`] is produced once per distinct source text and never changes
//! afterwards. Every function call already points at its [`Builtin`]
//! descriptor, so executing a program performs no name resolution.

use super::ast::{BinaryOperator, UnaryOperator};
use super::builtins::Builtin;
use crate::diagnostic::Span;
use crate::value::{FieldPath, Value};

/// A resolved program. Immutable and safe to share across threads.
#[derive(Debug, PartialEq)]
pub struct Program {
    source: String,
    statements: Vec<Node>,
}

impl Program {
    pub(crate) fn new(source: impl Into<String>, statements: Vec<Node>) -> Self {
        Self {
            source: source.into(),
            statements,
        }
    }

    /// The text this program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[Node] {
        &self.statements
    }
}

#[derive(Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, PartialEq)]
pub enum NodeKind {
    /// A fully literal value
    Constant(Value),
    /// Array literal with computed items
    Array(Vec<Node>),
    /// Object literal with computed values
    Object(Vec<(String, Node)>),
    /// Read from the event root
    Path(FieldPath),
    /// Read from the result of another expression
    Access { base: Box<Node>, path: FieldPath },
    /// `.target = value`
    Assign { target: FieldPath, value: Box<Node> },
    /// `.ok, .err = call(...)`
    AssignFallible {
        ok: FieldPath,
        err: FieldPath,
        call: Call,
    },
    Call(Call),
    Binary {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    If {
        condition: Box<Node>,
        consequent: Vec<Node>,
        alternative: Option<Box<Node>>,
    },
    Block(Vec<Node>),
}

/// A call site bound to its built-in.
#[derive(Debug, PartialEq)]
pub struct Call {
    pub function: &'static Builtin,
    /// Failure halts the program instead of producing an error value
    pub abort_on_error: bool,
    pub arguments: Vec<CallArgument>,
}

#[derive(Debug, PartialEq)]
pub enum CallArgument {
    /// An evaluated expression
    Value(Node),
    /// An unevaluated root path, for `Path` parameters
    Path(FieldPath),
}
