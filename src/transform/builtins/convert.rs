//! Type conversions, type assertions and type inspection.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::{Kind, Value};
use chrono::{DateTime, TimeZone as _, Utc};

pub(super) static BUILTINS: &[&Builtin] = &[
    &TO_INT,
    &TO_FLOAT,
    &TO_BOOL,
    &TO_STRING,
    &TO_TIMESTAMP,
    &STRING,
    &INT,
    &FLOAT,
    &BOOL,
    &ARRAY,
    &OBJECT,
    &TYPE_OF,
    &IS_NULL,
];

const VALUE: &[Parameter] = &[Parameter::required("value")];

macro_rules! conversion {
    ($ident:ident, $name:literal, $fallible:literal, $function:ident) => {
        pub static $ident: Builtin = Builtin {
            name: $name,
            parameters: VALUE,
            variadic: false,
            fallible: $fallible,
            effect: Effect::Pure,
            implementation: Implementation::Pure($function),
        };
    };
}

conversion!(TO_INT, "to_int", true, to_int);
conversion!(TO_FLOAT, "to_float", true, to_float);
conversion!(TO_BOOL, "to_bool", true, to_bool);
conversion!(TO_STRING, "to_string", true, to_string);
conversion!(TO_TIMESTAMP, "to_timestamp", true, to_timestamp);
conversion!(STRING, "string", true, assert_string);
conversion!(INT, "int", true, assert_integer);
conversion!(FLOAT, "float", true, assert_float);
conversion!(BOOL, "bool", true, assert_boolean);
conversion!(ARRAY, "array", true, assert_array);
conversion!(OBJECT, "object", true, assert_object);
conversion!(TYPE_OF, "type_of", false, type_of);
conversion!(IS_NULL, "is_null", false, is_null);

fn conversion_failure(value: &Value, target: &str) -> FunctionError {
    FunctionError::ConversionFailure(format!("unable to convert {} to {}", value, target))
}

fn to_int(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let converted = match value {
        Value::Integer(i) => *i,
        Value::Float(f) => {
            let truncated = f.trunc();
            if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64
            {
                return Err(conversion_failure(value, "integer"));
            }
            truncated as i64
        }
        Value::Boolean(b) => i64::from(*b),
        Value::Null => 0,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| conversion_failure(value, "integer"))?,
        Value::Timestamp(ts) => ts.timestamp(),
        other => return Err(FunctionError::type_mismatch("integer-convertible value", other)),
    };
    Ok(Value::Integer(converted))
}

fn to_float(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let converted = match value {
        Value::Float(f) => *f,
        Value::Integer(i) => *i as f64,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| conversion_failure(value, "float"))?,
        Value::Timestamp(ts) => {
            ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1_000_000_000.0
        }
        other => return Err(FunctionError::type_mismatch("float-convertible value", other)),
    };
    Ok(Value::Float(converted))
}

fn to_bool(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let converted = match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Null => false,
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => true,
            "false" | "f" | "no" | "n" | "0" => false,
            _ => return Err(conversion_failure(value, "boolean")),
        },
        other => return Err(FunctionError::type_mismatch("boolean-convertible value", other)),
    };
    Ok(Value::Boolean(converted))
}

fn to_string(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let converted = match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Timestamp(ts) => ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => return Err(FunctionError::type_mismatch("scalar value", other)),
    };
    Ok(Value::String(converted))
}

fn to_timestamp(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let utc = match value {
        Value::Timestamp(ts) => return Ok(Value::Timestamp(*ts)),
        Value::Integer(secs) => Utc.timestamp_opt(*secs, 0).single(),
        Value::Float(f) if f.is_finite() => {
            let secs = f.floor();
            let nanos = ((f - secs) * 1_000_000_000.0).round() as u32;
            Utc.timestamp_opt(secs as i64, nanos.min(999_999_999)).single()
        }
        Value::String(s) => {
            return DateTime::parse_from_rfc3339(s.trim())
                .map(Value::Timestamp)
                .map_err(|_| conversion_failure(value, "timestamp"))
        }
        Value::Float(_) => None,
        other => return Err(FunctionError::type_mismatch("timestamp-convertible value", other)),
    };
    utc.map(|ts| Value::Timestamp(ts.into()))
        .ok_or_else(|| conversion_failure(value, "timestamp"))
}

fn assert_kind(args: &Arguments, kind: Kind) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    if value.kind() == kind {
        Ok(value.clone())
    } else {
        Err(FunctionError::type_mismatch(kind.as_str(), value))
    }
}

fn assert_string(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::String)
}

fn assert_integer(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::Integer)
}

fn assert_float(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::Float)
}

fn assert_boolean(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::Boolean)
}

fn assert_array(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::Array)
}

fn assert_object(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    assert_kind(args, Kind::Object)
}

fn type_of(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::from(args.value(0).kind().as_str()))
}

fn is_null(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(args.value(0).is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::builtins::call_pure as call;

    #[test]
    fn test_to_int() {
        assert_eq!(call(&TO_INT, vec![Value::from(" 42 ")]), Ok(Value::Integer(42)));
        assert_eq!(call(&TO_INT, vec![Value::Float(-3.9)]), Ok(Value::Integer(-3)));
        assert_eq!(call(&TO_INT, vec![Value::Boolean(true)]), Ok(Value::Integer(1)));
        assert!(matches!(
            call(&TO_INT, vec![Value::from("4x")]),
            Err(FunctionError::ConversionFailure(_))
        ));
        assert!(matches!(
            call(&TO_INT, vec![Value::Float(f64::NAN)]),
            Err(FunctionError::ConversionFailure(_))
        ));
        assert!(matches!(
            call(&TO_INT, vec![Value::Array(vec![])]),
            Err(FunctionError::TypeMismatch { got: Kind::Array, .. })
        ));
    }

    #[test]
    fn test_to_float_and_bool() {
        assert_eq!(call(&TO_FLOAT, vec![Value::from("2.5")]), Ok(Value::Float(2.5)));
        assert_eq!(call(&TO_FLOAT, vec![Value::Integer(2)]), Ok(Value::Float(2.0)));
        assert_eq!(call(&TO_BOOL, vec![Value::from("yes")]), Ok(Value::Boolean(true)));
        assert_eq!(call(&TO_BOOL, vec![Value::Integer(0)]), Ok(Value::Boolean(false)));
        assert!(call(&TO_BOOL, vec![Value::from("maybe")]).is_err());
    }

    #[test]
    fn test_to_string() {
        assert_eq!(call(&TO_STRING, vec![Value::Integer(7)]), Ok(Value::from("7")));
        assert_eq!(call(&TO_STRING, vec![Value::Float(1.5)]), Ok(Value::from("1.5")));
        assert_eq!(call(&TO_STRING, vec![Value::Null]), Ok(Value::from("")));
        assert!(call(&TO_STRING, vec![Value::empty_object()]).is_err());
    }

    #[test]
    fn test_to_timestamp() {
        let ts = call(&TO_TIMESTAMP, vec![Value::Integer(1_600_000_000)]).unwrap();
        let Value::Timestamp(ts) = ts else {
            panic!("expected timestamp");
        };
        assert_eq!(ts.timestamp(), 1_600_000_000);

        let parsed = call(&TO_TIMESTAMP, vec![Value::from("2021-01-01T00:00:00+08:00")]).unwrap();
        assert_eq!(parsed.kind(), Kind::Timestamp);
        assert!(call(&TO_TIMESTAMP, vec![Value::from("yesterday")]).is_err());
    }

    #[test]
    fn test_assertions() {
        assert_eq!(call(&STRING, vec![Value::from("a")]), Ok(Value::from("a")));
        assert_eq!(
            call(&INT, vec![Value::from("1")]).unwrap_err().to_string(),
            "expected integer, got string"
        );
        assert!(call(&OBJECT, vec![Value::empty_object()]).is_ok());
        assert!(call(&ARRAY, vec![Value::Null]).is_err());
    }

    #[test]
    fn test_type_of_and_is_null() {
        assert_eq!(call(&TYPE_OF, vec![Value::Float(1.0)]), Ok(Value::from("float")));
        assert_eq!(call(&IS_NULL, vec![Value::Null]), Ok(Value::Boolean(true)));
        assert_eq!(call(&IS_NULL, vec![Value::Integer(0)]), Ok(Value::Boolean(false)));
    }
}
