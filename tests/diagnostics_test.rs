//! Integration tests for compile-time diagnostics.

use eventfold::{compile, DiagnosticCode};

fn codes(source: &str) -> Vec<DiagnosticCode> {
    match compile(source) {
        Ok(_) => Vec::new(),
        Err(diagnostics) => diagnostics.iter().map(|d| d.code).collect(),
    }
}

#[test]
fn test_bare_fallible_call_is_rejected() {
    let diagnostics = compile(".parsed = parse_json(.message)").unwrap_err();
    assert!(diagnostics.contains(DiagnosticCode::UnhandledFallibleCall));
    let message = &diagnostics.messages()[0];
    assert!(message.contains("parse_json"), "{}", message);
}

#[test]
fn test_compile_is_deterministic() {
    let source = ".a = to_int!(.b)\n.c, .err = parse_json(.d)\nif .a > 1 { .e = now() }";
    let first = compile(source).unwrap();
    let second = compile(source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_lexer_errors_are_collected_across_lines() {
    // Strings may span lines, so the unterminated one goes last.
    let source = ".b = 12abc\n.c = \"bad \\q escape\"\n.d = t'yesterday'\n.e = 1 @ 2\n.a = \"unterminated";
    assert_eq!(
        codes(source),
        vec![
            DiagnosticCode::InvalidNumber,
            DiagnosticCode::InvalidEscape,
            DiagnosticCode::InvalidTimestamp,
            DiagnosticCode::UnexpectedCharacter,
            DiagnosticCode::UnterminatedString,
        ]
    );
}

#[test]
fn test_syntax_errors_recover_per_statement() {
    let diagnostics = compile(".a = 1 2\n.b = 1\n.c = (2 3)\n.d = 4").unwrap_err();
    let lines: Vec<usize> = diagnostics
        .iter()
        .filter_map(|d| d.span.map(|s| s.line))
        .collect();
    assert_eq!(lines, vec![1, 3]);
    assert!(diagnostics
        .iter()
        .all(|d| d.code == DiagnosticCode::SyntaxError));
}

#[test]
fn test_resolution_errors() {
    assert_eq!(codes(".a = prase_json!(.b)"), vec![DiagnosticCode::UnknownFunction]);
    assert_eq!(codes(".a = upcase!(.b, .c)"), vec![DiagnosticCode::ArityMismatch]);
    assert_eq!(codes(".a = type_of!(.b)"), vec![DiagnosticCode::AbortInfallibleCall]);
    assert_eq!(codes(".a, .e = type_of(.b)"), vec![DiagnosticCode::UnnecessaryErrorAssignment]);
    assert_eq!(codes("del(\"a\")"), vec![DiagnosticCode::PathArgumentRequired]);
    assert_eq!(codes("del(.a, .b)"), vec![DiagnosticCode::ArityMismatch]);
}

#[test]
fn test_formatted_message_points_at_span() {
    let source = ".ok = 1\n.parsed = parse_json(.message)";
    let rendered = compile(source).unwrap_err().formatted_message();
    let lines: Vec<&str> = rendered.lines().collect();
    assert!(lines[0].starts_with("error[E103]"), "{}", rendered);
    assert!(rendered.contains(".parsed = parse_json(.message)"));
    let marker = lines
        .iter()
        .find(|line| line.contains('^'))
        .expect("span marker line");
    assert!(marker.contains(&"^".repeat("parse_json(.message)".len())));
    assert!(rendered.contains("help:"));
}

#[test]
fn test_unknown_function_suggests_fix() {
    let diagnostics = compile(".a = upcse!(.b)").unwrap_err();
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.suggestion.as_deref(), Some("did you mean `upcase`?"));
}

#[test]
fn test_lexer_error_inside_block_reports_only_itself() {
    let diagnostics = compile("if true { .b = \"\\q\" }\n.c = 1").unwrap_err();
    assert_eq!(
        diagnostics.messages(),
        vec!["invalid escape sequence in string literal".to_string()]
    );
}

#[test]
fn test_unquoted_non_ascii_key_is_rejected() {
    assert_eq!(
        codes(".café = 1"),
        vec![DiagnosticCode::UnexpectedCharacter]
    );
    assert!(compile(".\"café\" = 1").is_ok());
}

#[test]
fn test_smallest_integer_literal_compiles() {
    assert!(compile(".min = -9223372036854775808").is_ok());
    assert_eq!(
        codes(".min = - 9223372036854775808"),
        vec![DiagnosticCode::InvalidNumber]
    );
}
