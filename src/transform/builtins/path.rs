//! Built-ins that address the event root through a field path argument.

use super::{Arguments, Builtin, CallContext, Effect, FunctionError, Implementation, Parameter};
use crate::value::{FieldPath, Value};

pub(super) static BUILTINS: &[&Builtin] = &[&EXISTS, &DEL];

pub static EXISTS: Builtin = Builtin {
    name: "exists",
    parameters: &[Parameter::path("path")],
    variadic: false,
    fallible: false,
    effect: Effect::ReadRoot,
    implementation: Implementation::Pure(exists),
};

/// Removes a field and evaluates to its previous value (Null if absent).
pub static DEL: Builtin = Builtin {
    name: "del",
    parameters: &[Parameter::path("path")],
    variadic: false,
    fallible: false,
    effect: Effect::MutateRoot,
    implementation: Implementation::MutateRoot(del),
};

fn exists(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, FunctionError> {
    let present = args
        .path(0)
        .map(|path| ctx.root.get(path).is_some())
        .unwrap_or(false);
    Ok(Value::Boolean(present))
}

fn del(root: &mut Value, path: &FieldPath) -> Value {
    root.remove(path).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::config::TimeZone;
    use crate::transform::builtins::Argument;
    use serde_json::json;

    #[test]
    fn test_exists_distinguishes_null_from_absent() {
        let root = Value::from(json!({"a": null, "b": {"c": 1}}));
        let ctx = CallContext {
            root: &root,
            timezone: &TimeZone::Local,
        };
        for (path, expected) in [(".a", true), (".b.c", true), (".missing", false)] {
            let path: FieldPath = path.parse().unwrap();
            let value = root.get(&path).cloned();
            let args = Arguments::new(vec![Argument::from_path(path, value)]);
            assert_eq!(exists(&ctx, &args), Ok(Value::Boolean(expected)));
        }
    }

    #[test]
    fn test_del_returns_prior_value() {
        let mut root = Value::from(json!({"a": 1, "b": 2}));
        assert_eq!(del(&mut root, &".a".parse().unwrap()), Value::Integer(1));
        assert_eq!(del(&mut root, &".a".parse().unwrap()), Value::Null);
        assert_eq!(root, Value::from(json!({"b": 2})));
    }
}
