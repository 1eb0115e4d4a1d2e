//! JSON decoding and encoding built-ins.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::Value;
use serde_json::Value as JsonValue;

pub(super) static BUILTINS: &[&Builtin] = &[&PARSE_JSON, &ENCODE_JSON];

pub static PARSE_JSON: Builtin = Builtin {
    name: "parse_json",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(parse_json),
};

pub static ENCODE_JSON: Builtin = Builtin {
    name: "encode_json",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: false,
    effect: Effect::Pure,
    implementation: Implementation::Pure(encode_json),
};

fn parse_json(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let text = match value {
        Value::String(s) => s.as_bytes(),
        Value::Bytes(b) => b.as_ref(),
        other => return Err(FunctionError::type_mismatch("string", other)),
    };
    serde_json::from_slice::<JsonValue>(text)
        .map(Value::from)
        .map_err(|e| FunctionError::ConversionFailure(format!("unable to parse json: {}", e)))
}

fn encode_json(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let json = JsonValue::from(args.value(0).clone());
    Ok(Value::String(json.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::builtins::call_pure as call;
    use serde_json::json;

    #[test]
    fn test_parse_json_reproduces_structure() {
        let text = r#"{"status":"ok","nested":{"count":3,"ratio":0.5,"tags":["a",null,true]}}"#;
        let parsed = call(&PARSE_JSON, vec![Value::from(text)]).unwrap();
        assert_eq!(
            parsed,
            Value::from(json!({
                "status": "ok",
                "nested": { "count": 3, "ratio": 0.5, "tags": ["a", null, true] }
            }))
        );
        assert_eq!(
            parsed.get(&".nested.count".parse().unwrap()),
            Some(&Value::Integer(3))
        );
    }

    #[test]
    fn test_parse_json_failures() {
        let err = call(&PARSE_JSON, vec![Value::from("{not json")]).unwrap_err();
        assert!(matches!(err, FunctionError::ConversionFailure(ref m) if m.starts_with("unable to parse json")));

        let err = call(&PARSE_JSON, vec![Value::Integer(1)]).unwrap_err();
        assert_eq!(err.to_string(), "expected string, got integer");
    }

    #[test]
    fn test_encode_json() {
        let value = Value::from(json!({"b": [1, "x"], "a": null}));
        assert_eq!(
            call(&ENCODE_JSON, vec![value]).unwrap(),
            Value::from(r#"{"a":null,"b":[1,"x"]}"#)
        );
    }
}
