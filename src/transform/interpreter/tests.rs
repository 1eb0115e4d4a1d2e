//! Tests for the interpreter.

use super::Interpreter;
use crate::error::{FaultKind, RuntimeFault};
use crate::runtime::config::TimeZone;
use crate::transform::compile;
use crate::value::Value;
use serde_json::json;

fn run(source: &str, event: serde_json::Value) -> (Result<Value, RuntimeFault>, serde_json::Value) {
    let program = compile(source).unwrap_or_else(|d| panic!("{}", d.formatted_message()));
    let mut event = Value::from(event);
    let result = Interpreter::new(&mut event, TimeZone::Named(chrono_tz::UTC)).run(&program);
    (result, event.to_json())
}

fn fault(source: &str, event: serde_json::Value) -> RuntimeFault {
    run(source, event).0.unwrap_err()
}

#[test]
fn test_assignment_and_nested_paths() {
    let (result, event) = run(
        ".a.b = 1\n.list = [1, 2, 3]\n.list[-1] = \"last\"\n.copy = .list[0]",
        json!({}),
    );
    assert_eq!(result, Ok(Value::Integer(1)));
    assert_eq!(
        event,
        json!({"a": {"b": 1}, "list": [1, 2, "last"], "copy": 1})
    );
}

#[test]
fn test_absent_reads_are_null() {
    let (_, event) = run(".x = .missing.deep\n.y = .list[10]", json!({"list": [1]}));
    assert_eq!(event, json!({"list": [1], "x": null, "y": null}));
}

#[test]
fn test_write_through_missing_or_short_array_is_rejected() {
    let err = fault(".list[0] = 1", json!({}));
    assert_eq!(err.kind(), FaultKind::MissingField);
    let err = fault(".list[3] = 1", json!({"list": [1]}));
    assert_eq!(err.kind(), FaultKind::IndexOutOfRange);
    let err = fault(".name.first = 1", json!({"name": "ada"}));
    assert_eq!(err.kind(), FaultKind::TypeMismatch);
}

#[test]
fn test_two_target_assignment_captures_failure() {
    let (result, event) = run(
        ".parsed, .err = parse_json(.raw)\n.after = true",
        json!({"raw": "{not json"}),
    );
    assert_eq!(result, Ok(Value::Boolean(true)));
    assert_eq!(event["parsed"], json!(null));
    assert!(event["err"]
        .as_str()
        .unwrap()
        .starts_with("unable to parse json"));
    assert_eq!(event["after"], json!(true));

    let (_, event) = run(".parsed, .err = parse_json(.raw)", json!({"raw": "{\"a\": [1]}"}));
    assert_eq!(event["parsed"], json!({"a": [1]}));
    assert_eq!(event["err"], json!(null));
}

#[test]
fn test_abort_keeps_earlier_writes() {
    let (result, event) = run(
        ".before = 1\n.parsed = parse_json!(.raw)\n.after = 2",
        json!({"raw": "nope"}),
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind(), FaultKind::AbortedFallibleCall);
    assert!(err.span().is_some());
    let RuntimeFault::AbortedFallibleCall { function, .. } = &err else {
        panic!("expected aborted call");
    };
    assert_eq!(function, "parse_json");
    assert_eq!(event, json!({"raw": "nope", "before": 1}));
}

#[test]
fn test_postfix_access_on_call_result() {
    let (_, event) = run(
        ".status = parse_json!(.m).status\n.first = parse_json!(.m).items[0]",
        json!({"m": "{\"status\": 200, \"items\": [\"x\"]}"}),
    );
    assert_eq!(event["status"], json!(200));
    assert_eq!(event["first"], json!("x"));
}

#[test]
fn test_if_else_chain_selects_first_match() {
    let source = r#"
        if .n > 10 {
            .size = "large"
        } else if .n > 5 {
            .size = "medium"
        } else {
            .size = "small"
        }
    "#;
    for (n, expected) in [(20, "large"), (7, "medium"), (1, "small")] {
        let (_, event) = run(source, json!({ "n": n }));
        assert_eq!(event["size"], json!(expected));
    }

    let (result, event) = run("if false { .x = 1 }", json!({}));
    assert_eq!(result, Ok(Value::Null));
    assert_eq!(event, json!({}));
}

#[test]
fn test_if_requires_boolean_condition() {
    let err = fault("if .n { .x = 1 }", json!({"n": 1}));
    assert_eq!(err.kind(), FaultKind::TypeMismatch);
}

#[test]
fn test_logical_operators_short_circuit() {
    // The right operand would fault if evaluated.
    let (result, _) = run("false && (1 / 0 == 1)", json!({}));
    assert_eq!(result, Ok(Value::Boolean(false)));
    let (result, _) = run("true || (1 / 0 == 1)", json!({}));
    assert_eq!(result, Ok(Value::Boolean(true)));
    let err = fault("1 && true", json!({}));
    assert_eq!(err.kind(), FaultKind::TypeMismatch);
}

#[test]
fn test_division_by_zero_faults() {
    let err = fault(".x = .a / .b", json!({"a": 1, "b": 0}));
    assert_eq!(err.kind(), FaultKind::DivisionByZero);
}

#[test]
fn test_del_returns_prior_value() {
    let (result, event) = run(".old = del(.a)\ndel(.missing)", json!({"a": {"b": 1}, "c": 2}));
    assert_eq!(result, Ok(Value::Null));
    assert_eq!(event, json!({"old": {"b": 1}, "c": 2}));
}

#[test]
fn test_del_root_leaves_empty_event() {
    let (result, event) = run("del(.)", json!({"a": 1}));
    assert_eq!(result.unwrap().to_json(), json!({"a": 1}));
    assert_eq!(event, json!({}));
}

#[test]
fn test_push_rejects_non_array() {
    let (_, event) = run(".tags = push!(.tags, \"c\")", json!({"tags": ["a", "b"]}));
    assert_eq!(event["tags"], json!(["a", "b", "c"]));
    let err = fault(".tags = push!(.tags, \"c\")", json!({"tags": "a"}));
    assert_eq!(err.kind(), FaultKind::AbortedFallibleCall);
}

#[test]
fn test_root_assignment() {
    let (_, event) = run(". = {\"fresh\": true}", json!({"old": 1}));
    assert_eq!(event, json!({"fresh": true}));
    let err = fault(". = 1", json!({}));
    assert_eq!(err.kind(), FaultKind::TypeMismatch);
}

#[test]
fn test_root_must_be_object() {
    let program = compile(".a = 1").unwrap();
    let mut event = Value::Array(vec![]);
    let err = Interpreter::new(&mut event, TimeZone::Local)
        .run(&program)
        .unwrap_err();
    assert_eq!(err.kind(), FaultKind::InvalidArgument);
}

#[test]
fn test_exists_sees_presence() {
    let (_, event) = run(
        ".a = exists(.present)\n.b = exists(.nothing)\n.c = exists(.nil)",
        json!({"present": 1, "nil": null}),
    );
    assert_eq!(event["a"], json!(true));
    assert_eq!(event["b"], json!(false));
    assert_eq!(event["c"], json!(true));
}

#[test]
fn test_postfix_access_on_grouped_path() {
    let (_, event) = run(
        ".x = (.a).b\n.first = (.list)[0]\n.last = (.list)[-1]",
        json!({"a": {"b": 7}, "list": [1, 2, 3]}),
    );
    assert_eq!(event["x"], json!(7));
    assert_eq!(event["first"], json!(1));
    assert_eq!(event["last"], json!(3));
}

#[test]
fn test_smallest_integer_literal() {
    let (result, event) = run(".min = -9223372036854775808\n.diff = 5 -3", json!({}));
    assert_eq!(result, Ok(Value::Integer(2)));
    assert_eq!(event["min"], json!(i64::MIN));

    let err = fault(".x = -9223372036854775808 - 1", json!({}));
    assert_eq!(err.kind(), FaultKind::InvalidArgument);
}
