//! Compile-stage problem reports.
//!
//! Lexing, parsing and resolution all push [`Diagnostic`]s into one
//! [`DiagnosticSet`] instead of stopping at the first problem, so a single
//! compile attempt reports everything that is wrong with a program.

use std::fmt;

mod formatter;

use crate::error::RuntimeFault;

/// A region of source text.
///
/// `start`/`end` are byte offsets (half-open); `line`/`column` are the
/// 1-based position of `start`, with columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Returns a span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        if other.end <= self.start {
            return Span { end: self.end.max(other.end), ..other };
        }
        Span {
            end: self.end.max(other.end),
            ..self
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable identifiers for every problem the compiler can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnterminatedString,
    InvalidEscape,
    InvalidNumber,
    UnhandledFallibleCall,
    UnnecessaryErrorAssignment,
    UnknownFunction,
    ArityMismatch,
    SyntaxError,
    AbortInfallibleCall,
    PathArgumentRequired,
    InvalidTimestamp,
    UnexpectedCharacter,
    /// Runtime faults rendered through the same formatter
    RuntimeFault,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnterminatedString => "E100",
            DiagnosticCode::InvalidEscape => "E101",
            DiagnosticCode::InvalidNumber => "E102",
            DiagnosticCode::UnhandledFallibleCall => "E103",
            DiagnosticCode::UnnecessaryErrorAssignment => "E104",
            DiagnosticCode::UnknownFunction => "E105",
            DiagnosticCode::ArityMismatch => "E106",
            DiagnosticCode::SyntaxError => "E107",
            DiagnosticCode::AbortInfallibleCall => "E108",
            DiagnosticCode::PathArgumentRequired => "E109",
            DiagnosticCode::InvalidTimestamp => "E110",
            DiagnosticCode::UnexpectedCharacter => "E111",
            DiagnosticCode::RuntimeFault => "E000",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem report.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// One-line summary
    pub message: String,
    pub span: Option<Span>,
    /// Short text printed under the span marker
    pub label: Option<String>,
    /// Suggested fix, printed as a help line
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span: Some(span),
            label: None,
            suggestion: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn sort_key(&self) -> (usize, usize) {
        self.span.map(|s| (s.start, s.end)).unwrap_or((usize::MAX, 0))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// An ordered batch of diagnostics for one source text.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticSet {
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSet {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Builds a set from collected diagnostics, ordered by source position.
    pub fn from_diagnostics(source: impl Into<String>, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by_key(Diagnostic::sort_key);
        Self {
            source: source.into(),
            diagnostics,
        }
    }

    /// Wraps a runtime fault so it can be rendered against its source.
    pub fn from_fault(source: impl Into<String>, fault: &RuntimeFault) -> Self {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            code: DiagnosticCode::RuntimeFault,
            message: fault.to_string(),
            span: fault.span(),
            label: Some(fault.kind().to_string()),
            suggestion: None,
        };
        Self {
            source: source.into(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let key = diagnostic.sort_key();
        let index = self
            .diagnostics
            .partition_point(|existing| existing.sort_key() <= key);
        self.diagnostics.insert(index, diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if any diagnostic has the given code.
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    /// Plain-text messages in source order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    /// Multi-line report interleaving source lines with span markers.
    pub fn formatted_message(&self) -> String {
        formatter::render(&self.source, &self.diagnostics, false)
    }

    /// Same as [`formatted_message`](Self::formatted_message) with ANSI colors.
    pub fn colored_message(&self) -> String {
        formatter::render(&self.source, &self.diagnostics, true)
    }
}

impl fmt::Display for DiagnosticSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted_message())
    }
}

impl std::error::Error for DiagnosticSet {}

impl<'a> IntoIterator for &'a DiagnosticSet {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_source_order() {
        let mut set = DiagnosticSet::new(".a = 1\n.b = 2");
        set.push(Diagnostic::error(DiagnosticCode::SyntaxError, "second", Span::new(7, 9, 2, 1)));
        set.push(Diagnostic::error(DiagnosticCode::SyntaxError, "first", Span::new(0, 2, 1, 1)));
        assert_eq!(set.messages(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_span_join() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(5, 9, 1, 6);
        assert_eq!(a.to(b), Span::new(0, 9, 1, 1));
        assert_eq!(b.to(a), Span::new(0, 9, 1, 1));
    }
}
