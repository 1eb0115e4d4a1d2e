//! Error types for the remap runtime.
//!
//! Problems are split by when they happen. Everything found before execution
//! (lexing, parsing, resolution) is batched into a [`DiagnosticSet`]; faults
//! raised while a program runs stop execution immediately and surface as a
//! single [`RuntimeFault`]. [`RemapError`] wraps both, plus configuration
//! failures, so callers can tell fix-and-recompile apart from retry/skip.

use crate::diagnostic::{DiagnosticSet, Span};
use crate::runtime::config::ConfigError;
use crate::transform::builtins::FunctionError;
use std::fmt;
use thiserror::Error;

/// Result type for runtime entry points.
pub type RemapResult<T> = Result<T, RemapError>;

/// Unified error type for compile, configure and execute.
#[derive(Debug, Error)]
pub enum RemapError {
    /// The program failed to compile
    #[error("program failed to compile:\n{0}")]
    Compile(DiagnosticSet),

    /// The program faulted while running
    #[error("program execution failed: {0}")]
    Runtime(#[from] RuntimeFault),

    /// The runtime configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<DiagnosticSet> for RemapError {
    fn from(diagnostics: DiagnosticSet) -> Self {
        RemapError::Compile(diagnostics)
    }
}

/// Discriminant of a [`RuntimeFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    TypeMismatch,
    AbortedFallibleCall,
    MissingField,
    InvalidArgument,
    ConversionFailure,
    DivisionByZero,
    IndexOutOfRange,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::TypeMismatch => "type mismatch",
            FaultKind::AbortedFallibleCall => "aborted fallible call",
            FaultKind::MissingField => "missing field",
            FaultKind::InvalidArgument => "invalid argument",
            FaultKind::ConversionFailure => "conversion failure",
            FaultKind::DivisionByZero => "division by zero",
            FaultKind::IndexOutOfRange => "index out of range",
        };
        f.write_str(name)
    }
}

/// A fault that halted program execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeFault {
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String, span: Option<Span> },

    #[error("function call error for \"{function}\": {cause}")]
    AbortedFallibleCall {
        function: String,
        cause: FunctionError,
        span: Option<Span>,
    },

    #[error("missing field: {message}")]
    MissingField { message: String, span: Option<Span> },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String, span: Option<Span> },

    #[error("conversion failure: {message}")]
    ConversionFailure { message: String, span: Option<Span> },

    #[error("division by zero")]
    DivisionByZero { span: Option<Span> },

    #[error("index out of range: {message}")]
    IndexOutOfRange { message: String, span: Option<Span> },
}

impl RuntimeFault {
    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn invalid_argument(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            span,
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            RuntimeFault::TypeMismatch { .. } => FaultKind::TypeMismatch,
            RuntimeFault::AbortedFallibleCall { .. } => FaultKind::AbortedFallibleCall,
            RuntimeFault::MissingField { .. } => FaultKind::MissingField,
            RuntimeFault::InvalidArgument { .. } => FaultKind::InvalidArgument,
            RuntimeFault::ConversionFailure { .. } => FaultKind::ConversionFailure,
            RuntimeFault::DivisionByZero { .. } => FaultKind::DivisionByZero,
            RuntimeFault::IndexOutOfRange { .. } => FaultKind::IndexOutOfRange,
        }
    }

    /// Source location of the expression that faulted, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            RuntimeFault::TypeMismatch { span, .. }
            | RuntimeFault::AbortedFallibleCall { span, .. }
            | RuntimeFault::MissingField { span, .. }
            | RuntimeFault::InvalidArgument { span, .. }
            | RuntimeFault::ConversionFailure { span, .. }
            | RuntimeFault::DivisionByZero { span }
            | RuntimeFault::IndexOutOfRange { span, .. } => *span,
        }
    }
}
