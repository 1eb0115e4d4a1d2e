//! Built-in function library.
//!
//! Every built-in is a static [`Builtin`] descriptor declaring its name,
//! parameters, fallibility and effect on the event root. The compiler resolves
//! call sites to these descriptors once, so the interpreter never looks up a
//! function by name while a program runs.

use crate::runtime::config::TimeZone;
use crate::value::{FieldPath, Kind, Value};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

mod codec;
mod collection;
mod convert;
mod json;
mod path;
mod string;
mod time;

/// Why a built-in call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: Kind },

    #[error("required field {path} is missing")]
    MissingField { path: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    ConversionFailure(String),
}

impl FunctionError {
    pub fn type_mismatch(expected: impl Into<String>, got: &Value) -> Self {
        FunctionError::TypeMismatch {
            expected: expected.into(),
            got: got.kind(),
        }
    }
}

/// How an argument is passed to a built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Any expression, evaluated before the call
    Value,
    /// A literal field path from the event root, passed unevaluated
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub keyword: &'static str,
    pub kind: ParameterKind,
    /// Whether the argument must be supplied
    pub required: bool,
}

impl Parameter {
    pub const fn required(keyword: &'static str) -> Self {
        Self {
            keyword,
            kind: ParameterKind::Value,
            required: true,
        }
    }

    pub const fn optional(keyword: &'static str) -> Self {
        Self {
            keyword,
            kind: ParameterKind::Value,
            required: false,
        }
    }

    pub const fn path(keyword: &'static str) -> Self {
        Self {
            keyword,
            kind: ParameterKind::Path,
            required: true,
        }
    }
}

/// What a built-in may touch besides its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A function of its arguments only
    Pure,
    /// Reads the event root through a path parameter
    ReadRoot,
    /// Mutates the event root
    MutateRoot,
}

/// Signature of non-mutating built-ins.
pub type PureFn = fn(&CallContext<'_>, &Arguments) -> Result<Value, FunctionError>;

/// Signature of root-mutating built-ins. They receive the root and the path
/// argument and cannot fail.
pub type MutateFn = fn(&mut Value, &FieldPath) -> Value;

#[derive(Clone, Copy)]
pub enum Implementation {
    Pure(PureFn),
    MutateRoot(MutateFn),
}

/// Descriptor of one built-in function.
pub struct Builtin {
    pub name: &'static str,
    pub parameters: &'static [Parameter],
    /// The last parameter may repeat
    pub variadic: bool,
    pub fallible: bool,
    pub effect: Effect,
    pub implementation: Implementation,
}

impl Builtin {
    pub fn min_arity(&self) -> usize {
        self.parameters.iter().filter(|p| p.required).count()
    }

    /// `None` for variadic functions.
    pub fn max_arity(&self) -> Option<usize> {
        (!self.variadic).then_some(self.parameters.len())
    }

    /// Parameter descriptor for the argument at `index`.
    pub fn parameter(&self, index: usize) -> Option<&'static Parameter> {
        let params: &'static [Parameter] = self.parameters;
        match params.get(index) {
            Some(param) => Some(param),
            None if self.variadic => params.last(),
            None => None,
        }
    }

    /// Human-readable arity, e.g. `1`, `1 to 2` or `at least 2`.
    pub fn arity_description(&self) -> String {
        let min = self.min_arity();
        match self.max_arity() {
            None => format!("at least {}", min),
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
        }
    }
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("fallible", &self.fallible)
            .field("effect", &self.effect)
            .finish()
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Read-only view handed to pure built-ins.
pub struct CallContext<'a> {
    pub root: &'a Value,
    pub timezone: &'a TimeZone,
}

/// One evaluated argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub value: Value,
    /// False when the argument was a field path that resolved to nothing
    pub present: bool,
    /// The path the argument was read from, if it was a root path
    pub path: Option<FieldPath>,
}

impl Argument {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            present: true,
            path: None,
        }
    }

    pub fn from_path(path: FieldPath, value: Option<Value>) -> Self {
        Self {
            present: value.is_some(),
            value: value.unwrap_or(Value::Null),
            path: Some(path),
        }
    }
}

static NULL: Value = Value::Null;

/// Evaluated arguments of one call, in positional order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    pub fn new(items: Vec<Argument>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The argument value, or Null when it was not supplied or absent.
    pub fn value(&self, index: usize) -> &Value {
        self.items.get(index).map(|a| &a.value).unwrap_or(&NULL)
    }

    /// The argument value, or `None` when it was not supplied.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index).map(|a| &a.value)
    }

    /// The argument value, failing with `MissingField` when it was read from
    /// an absent field path.
    pub fn required(&self, index: usize) -> Result<&Value, FunctionError> {
        match self.items.get(index) {
            Some(arg) if arg.present => Ok(&arg.value),
            Some(arg) => Err(FunctionError::MissingField {
                path: arg
                    .path
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| format!("argument {}", index + 1)),
            }),
            None => Err(FunctionError::InvalidArgument(format!(
                "missing argument {}",
                index + 1
            ))),
        }
    }

    pub fn path(&self, index: usize) -> Option<&FieldPath> {
        self.items.get(index).and_then(|a| a.path.as_ref())
    }

    /// Values from `index` onward (variadic tail).
    pub fn rest(&self, index: usize) -> impl Iterator<Item = &Argument> {
        self.items.iter().skip(index)
    }

    /// Reads a string argument.
    pub fn string(&self, index: usize) -> Result<&str, FunctionError> {
        let value = self.required(index)?;
        value
            .as_str()
            .ok_or_else(|| FunctionError::type_mismatch("string", value))
    }

    /// Reads an optional string argument.
    pub fn optional_string(&self, index: usize) -> Result<Option<&str>, FunctionError> {
        match self.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(FunctionError::type_mismatch("string", other)),
        }
    }
}

/// Name-indexed set of built-ins.
pub struct FunctionLibrary {
    functions: HashMap<&'static str, &'static Builtin>,
}

static STANDARD: Lazy<FunctionLibrary> = Lazy::new(|| {
    FunctionLibrary::from_builtins(
        json::BUILTINS
            .iter()
            .chain(convert::BUILTINS)
            .chain(path::BUILTINS)
            .chain(collection::BUILTINS)
            .chain(string::BUILTINS)
            .chain(time::BUILTINS)
            .chain(codec::BUILTINS)
            .copied(),
    )
});

impl FunctionLibrary {
    pub fn from_builtins(builtins: impl IntoIterator<Item = &'static Builtin>) -> Self {
        Self {
            functions: builtins.into_iter().map(|b| (b.name, b)).collect(),
        }
    }

    /// The library every program is compiled against.
    pub fn standard() -> &'static FunctionLibrary {
        &STANDARD
    }

    pub fn get(&self, name: &str) -> Option<&'static Builtin> {
        self.functions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Closest known name to `name` within a small edit distance.
    pub fn suggest(&self, name: &str) -> Option<&'static str> {
        let limit = (name.chars().count() / 3).max(1);
        self.names()
            .into_iter()
            .map(|candidate| (edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= limit)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate)
    }
}

/// Levenshtein distance over characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        previous = current;
    }
    previous[b.len()]
}

/// Invokes a pure built-in against an empty root in UTC.
#[cfg(test)]
pub(crate) fn call_pure(builtin: &Builtin, args: Vec<Value>) -> Result<Value, FunctionError> {
    let root = Value::empty_object();
    let timezone = TimeZone::Named(chrono_tz::UTC);
    let ctx = CallContext {
        root: &root,
        timezone: &timezone,
    };
    let args = Arguments::new(args.into_iter().map(Argument::value).collect());
    match builtin.implementation {
        Implementation::Pure(f) => f(&ctx, &args),
        Implementation::MutateRoot(_) => Err(FunctionError::InvalidArgument(format!(
            "{} mutates the root",
            builtin.name
        ))),
    }
}
