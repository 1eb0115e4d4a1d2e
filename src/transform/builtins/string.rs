//! String built-ins.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Patterns seen by `match`, compiled once per process.
static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Once this many distinct patterns are cached the cache starts over.
const PATTERN_CACHE_LIMIT: usize = 256;

pub(super) static BUILTINS: &[&Builtin] = &[
    &UPCASE,
    &DOWNCASE,
    &CONTAINS,
    &STARTS_WITH,
    &ENDS_WITH,
    &REPLACE,
    &SPLIT,
    &STRIP_WHITESPACE,
    &MATCH,
];

const VALUE: &[Parameter] = &[Parameter::required("value")];
const VALUE_AND_SUBSTRING: &[Parameter] = &[
    Parameter::required("value"),
    Parameter::required("substring"),
];

macro_rules! string_builtin {
    ($ident:ident, $name:literal, $parameters:expr, $function:ident) => {
        pub static $ident: Builtin = Builtin {
            name: $name,
            parameters: $parameters,
            variadic: false,
            fallible: true,
            effect: Effect::Pure,
            implementation: Implementation::Pure($function),
        };
    };
}

string_builtin!(UPCASE, "upcase", VALUE, upcase);
string_builtin!(DOWNCASE, "downcase", VALUE, downcase);
string_builtin!(CONTAINS, "contains", VALUE_AND_SUBSTRING, contains);
string_builtin!(STARTS_WITH, "starts_with", VALUE_AND_SUBSTRING, starts_with);
string_builtin!(ENDS_WITH, "ends_with", VALUE_AND_SUBSTRING, ends_with);
string_builtin!(
    REPLACE,
    "replace",
    &[
        Parameter::required("value"),
        Parameter::required("pattern"),
        Parameter::required("with"),
    ],
    replace
);
string_builtin!(
    SPLIT,
    "split",
    &[Parameter::required("value"), Parameter::required("pattern")],
    split
);
string_builtin!(STRIP_WHITESPACE, "strip_whitespace", VALUE, strip_whitespace);
string_builtin!(
    MATCH,
    "match",
    &[Parameter::required("value"), Parameter::required("pattern")],
    matches_pattern
);

fn upcase(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::String(args.string(0)?.to_uppercase()))
}

fn downcase(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::String(args.string(0)?.to_lowercase()))
}

fn contains(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.string(0)?.contains(args.string(1)?)))
}

fn starts_with(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.string(0)?.starts_with(args.string(1)?)))
}

fn ends_with(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.string(0)?.ends_with(args.string(1)?)))
}

/// Replaces every occurrence of a literal pattern.
fn replace(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.string(0)?;
    let pattern = args.string(1)?;
    let with = args.string(2)?;
    if pattern.is_empty() {
        return Err(FunctionError::InvalidArgument(
            "replace pattern must not be empty".to_string(),
        ));
    }
    Ok(Value::String(value.replace(pattern, with)))
}

fn split(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.string(0)?;
    let pattern = args.string(1)?;
    let parts: Vec<Value> = if pattern.is_empty() {
        value.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        value.split(pattern).map(Value::from).collect()
    };
    Ok(Value::Array(parts))
}

fn strip_whitespace(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::from(args.string(0)?.trim()))
}

fn matches_pattern(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.string(0)?;
    let pattern = args.string(1)?;
    let regex = compiled_pattern(pattern)?;
    Ok(Value::Boolean(regex.is_match(value)))
}

fn compiled_pattern(pattern: &str) -> Result<Regex, FunctionError> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = patterns.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern).map_err(|e| {
        FunctionError::InvalidArgument(format!("invalid regular expression: {}", e))
    })?;
    if patterns.len() >= PATTERN_CACHE_LIMIT {
        patterns.clear();
    }
    patterns.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::builtins::call_pure as call;
    use serde_json::json;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(call(&UPCASE, vec![s("Hello")]), Ok(s("HELLO")));
        assert_eq!(call(&DOWNCASE, vec![s("Hello")]), Ok(s("hello")));
        assert!(call(&UPCASE, vec![Value::Integer(1)]).is_err());
    }

    #[test]
    fn test_substring_predicates() {
        assert_eq!(call(&CONTAINS, vec![s("foobar"), s("oba")]), Ok(Value::Boolean(true)));
        assert_eq!(call(&STARTS_WITH, vec![s("foobar"), s("bar")]), Ok(Value::Boolean(false)));
        assert_eq!(call(&ENDS_WITH, vec![s("foobar"), s("bar")]), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_replace_and_split() {
        assert_eq!(call(&REPLACE, vec![s("a-b-c"), s("-"), s("+")]), Ok(s("a+b+c")));
        assert!(call(&REPLACE, vec![s("abc"), s(""), s("x")]).is_err());
        assert_eq!(
            call(&SPLIT, vec![s("a,b,,c"), s(",")]),
            Ok(Value::from(json!(["a", "b", "", "c"])))
        );
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(call(&STRIP_WHITESPACE, vec![s("  x y \n")]), Ok(s("x y")));
    }

    #[test]
    fn test_match() {
        assert_eq!(
            call(&MATCH, vec![s("error 404"), s(r"\d{3}")]),
            Ok(Value::Boolean(true))
        );
        assert!(matches!(
            call(&MATCH, vec![s("x"), s("(")]),
            Err(FunctionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_patterns_are_compiled_once() {
        let pattern = r"^cached-[a-z]+$";
        assert_eq!(call(&MATCH, vec![s("cached-abc"), s(pattern)]), Ok(Value::Boolean(true)));
        assert_eq!(call(&MATCH, vec![s("cached-123"), s(pattern)]), Ok(Value::Boolean(false)));
        let patterns = PATTERNS.lock().unwrap();
        assert!(patterns.contains_key(pattern));
        assert!(!patterns.contains_key("("));
    }
}
