//! Text rendering for diagnostic sets.

use super::{Diagnostic, Span};
use colored::Colorize;
use std::fmt::Write;

/// Location of a span inside the source, resolved for display.
struct SourceLine<'a> {
    number: usize,
    text: &'a str,
    /// Characters before the span on this line
    offset: usize,
    /// Characters of the span on this line (at least one)
    width: usize,
}

fn locate<'a>(source: &'a str, span: Span) -> Option<SourceLine<'a>> {
    let start = span.start.min(source.len());
    if !source.is_char_boundary(start) {
        return None;
    }
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[start..]
        .find('\n')
        .map(|i| start + i)
        .unwrap_or(source.len());
    let marked_end = span.end.clamp(start, line_end);
    let text = source.get(line_start..line_end)?;
    let offset = source.get(line_start..start)?.chars().count();
    let width = source.get(start..marked_end)?.chars().count().max(1);
    Some(SourceLine {
        number: span.line,
        text: text.trim_end_matches('\r'),
        offset,
        width,
    })
}

fn paint(text: &str, colored: bool, style: fn(&str) -> colored::ColoredString) -> String {
    if colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn render_one(out: &mut String, source: &str, diagnostic: &Diagnostic, colored: bool) {
    let header = format!("{}[{}]", diagnostic.severity, diagnostic.code);
    let _ = writeln!(
        out,
        "{}: {}",
        paint(&header, colored, |s| s.red().bold()),
        paint(&diagnostic.message, colored, |s| s.bold())
    );

    let Some(line) = diagnostic.span.and_then(|span| locate(source, span)) else {
        if let Some(suggestion) = &diagnostic.suggestion {
            let _ = writeln!(out, "  = {}: {}", paint("help", colored, |s| s.cyan()), suggestion);
        }
        return;
    };

    let gutter = " ".repeat(line.number.to_string().len());
    let bar = paint("│", colored, |s| s.blue());
    let column = line.offset + 1;
    let _ = writeln!(
        out,
        "{}{} :{}:{}",
        gutter,
        paint(" ┌─", colored, |s| s.blue()),
        line.number,
        column
    );
    let _ = writeln!(out, "{} {}", gutter, bar);
    let _ = writeln!(
        out,
        "{} {} {}",
        paint(&line.number.to_string(), colored, |s| s.blue()),
        bar,
        line.text
    );
    let markers = paint(&"^".repeat(line.width), colored, |s| s.red().bold());
    match &diagnostic.label {
        Some(label) => {
            let _ = writeln!(
                out,
                "{} {} {}{} {}",
                gutter,
                bar,
                " ".repeat(line.offset),
                markers,
                paint(label, colored, |s| s.red())
            );
        }
        None => {
            let _ = writeln!(out, "{} {} {}{}", gutter, bar, " ".repeat(line.offset), markers);
        }
    }
    let _ = writeln!(out, "{} {}", gutter, bar);
    if let Some(suggestion) = &diagnostic.suggestion {
        let _ = writeln!(
            out,
            "{} = {}: {}",
            gutter,
            paint("help", colored, |s| s.cyan()),
            suggestion
        );
    }
}

/// Renders every diagnostic, separated by blank lines.
pub(super) fn render(source: &str, diagnostics: &[Diagnostic], colored: bool) -> String {
    let mut out = String::new();
    for (i, diagnostic) in diagnostics.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_one(&mut out, source, diagnostic, colored);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    #[test]
    fn test_render_marks_span_under_source_line() {
        let source = ".a = 1\n.parsed = parse_json(.message)";
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnhandledFallibleCall,
            "unhandled fallible call",
            Span::new(17, 37, 2, 11),
        )
        .with_label("this call can fail")
        .with_suggestion("use parse_json!(...)");

        let rendered = render(source, &[diagnostic], false);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "error[E103]: unhandled fallible call");
        assert_eq!(lines[1], "  ┌─ :2:11");
        assert_eq!(lines[3], "2 │ .parsed = parse_json(.message)");
        assert_eq!(lines[4], "  │           ^^^^^^^^^^^^^^^^^^^^ this call can fail");
        assert_eq!(lines[6], "  = help: use parse_json!(...)");
    }

    #[test]
    fn test_render_without_span() {
        let mut diagnostic =
            Diagnostic::error(DiagnosticCode::SyntaxError, "something", Span::default());
        diagnostic.span = None;
        let rendered = render("", &[diagnostic], false);
        assert_eq!(rendered, "error[E107]: something\n");
    }
}
