//! Array and object built-ins.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::{ObjectMap, Value};

pub(super) static BUILTINS: &[&Builtin] = &[
    &PUSH, &APPEND, &LENGTH, &KEYS, &VALUES, &MERGE, &JOIN, &COMPACT,
];

pub static PUSH: Builtin = Builtin {
    name: "push",
    parameters: &[Parameter::required("value"), Parameter::required("item")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(push),
};

pub static APPEND: Builtin = Builtin {
    name: "append",
    parameters: &[Parameter::required("value"), Parameter::required("items")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(append),
};

pub static LENGTH: Builtin = Builtin {
    name: "length",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(length),
};

pub static KEYS: Builtin = Builtin {
    name: "keys",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(keys),
};

pub static VALUES: Builtin = Builtin {
    name: "values",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(values),
};

/// Shallow merge; later objects win on key conflicts.
pub static MERGE: Builtin = Builtin {
    name: "merge",
    parameters: &[Parameter::required("to"), Parameter::required("from")],
    variadic: true,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(merge),
};

pub static JOIN: Builtin = Builtin {
    name: "join",
    parameters: &[Parameter::required("value"), Parameter::optional("separator")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(join),
};

/// Recursively drops nulls, empty strings, empty arrays and empty objects.
pub static COMPACT: Builtin = Builtin {
    name: "compact",
    parameters: &[Parameter::required("value")],
    variadic: false,
    fallible: true,
    effect: Effect::Pure,
    implementation: Implementation::Pure(compact),
};

fn array_arg(args: &Arguments, index: usize) -> Result<&Vec<Value>, FunctionError> {
    let value = args.required(index)?;
    value
        .as_array()
        .ok_or_else(|| FunctionError::type_mismatch("array", value))
}

fn object_arg(args: &Arguments, index: usize) -> Result<&ObjectMap, FunctionError> {
    let value = args.required(index)?;
    value
        .as_object()
        .ok_or_else(|| FunctionError::type_mismatch("object", value))
}

fn push(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let mut items = array_arg(args, 0)?.clone();
    items.push(args.value(1).clone());
    Ok(Value::Array(items))
}

fn append(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let mut items = array_arg(args, 0)?.clone();
    items.extend(array_arg(args, 1)?.iter().cloned());
    Ok(Value::Array(items))
}

fn length(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    let len = match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        other => return Err(FunctionError::type_mismatch("array, object or string", other)),
    };
    i64::try_from(len)
        .map(Value::Integer)
        .map_err(|_| FunctionError::InvalidArgument("length exceeds integer range".to_string()))
}

fn keys(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let map = object_arg(args, 0)?;
    Ok(Value::Array(map.keys().cloned().map(Value::String).collect()))
}

fn values(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let map = object_arg(args, 0)?;
    Ok(Value::Array(map.values().cloned().collect()))
}

fn merge(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let mut merged = object_arg(args, 0)?.clone();
    for index in 1..args.len() {
        for (key, value) in object_arg(args, index)? {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}

fn join(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let items = array_arg(args, 0)?;
    let separator = args.optional_string(1)?.unwrap_or("");
    let parts = items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| FunctionError::type_mismatch("array of strings", item))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn compact_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(compact_value)
                .filter(|v| !is_empty(v))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, compact_value(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        other => other,
    }
}

fn compact(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.required(0)?;
    match value {
        Value::Array(_) | Value::Object(_) => Ok(compact_value(value.clone())),
        other => Err(FunctionError::type_mismatch("array or object", other)),
    }
}
