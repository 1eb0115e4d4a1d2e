//! Core interpreter engine.
//!
//! This module contains the Interpreter struct and the evaluation dispatch
//! for compiled program nodes.

use super::operators;
use crate::diagnostic::Span;
use crate::error::RuntimeFault;
use crate::runtime::config::TimeZone;
use crate::transform::ast::{BinaryOperator, UnaryOperator};
use crate::transform::builtins::{
    Argument, Arguments, CallContext, FunctionError, Implementation,
};
use crate::transform::program::{Call, CallArgument, Node, NodeKind, Program};
use crate::value::{FieldPath, ObjectMap, PathError, Value};

/// Interpreter for compiled remap programs.
///
/// Borrows the event for the duration of one execution. All writes go
/// straight to the event, so statements that ran before a fault stay applied.
pub struct Interpreter<'a> {
    /// The event being transformed
    target: &'a mut Value,

    /// Zone consulted by time built-ins
    timezone: TimeZone,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter over `target`.
    pub fn new(target: &'a mut Value, timezone: TimeZone) -> Self {
        Self { target, timezone }
    }

    /// Runs every statement in order and returns the value of the last one.
    pub fn run(&mut self, program: &Program) -> Result<Value, RuntimeFault> {
        if !matches!(self.target, Value::Object(_)) {
            return Err(RuntimeFault::invalid_argument(
                format!("event root must be an object, got {}", self.target.kind()),
                None,
            ));
        }
        self.evaluate_statements(program.statements())
    }

    /// Evaluates a node.
    pub fn evaluate(&mut self, node: &Node) -> Result<Value, RuntimeFault> {
        let span = node.span;
        match &node.kind {
            NodeKind::Constant(value) => Ok(value.clone()),
            NodeKind::Array(items) => self.evaluate_array(items),
            NodeKind::Object(entries) => self.evaluate_object(entries),
            NodeKind::Path(path) => Ok(self.read(path)),
            NodeKind::Access { base, path } => self.evaluate_access(base, path),
            NodeKind::Assign { target, value } => self.evaluate_assign(target, value, span),
            NodeKind::AssignFallible { ok, err, call } => {
                self.evaluate_assign_fallible(ok, err, call, span)
            }
            NodeKind::Call(call) => self.evaluate_call(call, span),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => self.evaluate_binary_op(*operator, left, right, span),
            NodeKind::Unary { operator, operand } => {
                self.evaluate_unary_op(*operator, operand, span)
            }
            NodeKind::If {
                condition,
                consequent,
                alternative,
            } => self.evaluate_if_else(condition, consequent, alternative.as_deref()),
            NodeKind::Block(statements) => self.evaluate_statements(statements),
        }
    }

    /// Evaluates statements in order; an empty list yields null.
    fn evaluate_statements(&mut self, statements: &[Node]) -> Result<Value, RuntimeFault> {
        let mut last = Value::Null;
        for statement in statements {
            last = self.evaluate(statement)?;
        }
        Ok(last)
    }

    /// Reads a root path; absent locations read as null.
    fn read(&self, path: &FieldPath) -> Value {
        self.target.get(path).cloned().unwrap_or(Value::Null)
    }

    fn evaluate_array(&mut self, items: &[Node]) -> Result<Value, RuntimeFault> {
        items
            .iter()
            .map(|item| self.evaluate(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn evaluate_object(&mut self, entries: &[(String, Node)]) -> Result<Value, RuntimeFault> {
        let mut map = ObjectMap::new();
        for (key, node) in entries {
            let value = self.evaluate(node)?;
            map.insert(key.clone(), value);
        }
        Ok(Value::Object(map))
    }

    /// Evaluates postfix access on a computed value (`expr.field`).
    fn evaluate_access(&mut self, base: &Node, path: &FieldPath) -> Result<Value, RuntimeFault> {
        let value = self.evaluate(base)?;
        Ok(value.get(path).cloned().unwrap_or(Value::Null))
    }

    /// Evaluates `.target = value` and yields the assigned value.
    fn evaluate_assign(
        &mut self,
        target: &FieldPath,
        value: &Node,
        span: Span,
    ) -> Result<Value, RuntimeFault> {
        let value = self.evaluate(value)?;
        self.write(target, value.clone(), span)?;
        Ok(value)
    }

    /// Evaluates `.ok, .err = call(...)`. A failing call writes null and the
    /// error message instead of halting.
    fn evaluate_assign_fallible(
        &mut self,
        ok: &FieldPath,
        err: &FieldPath,
        call: &Call,
        span: Span,
    ) -> Result<Value, RuntimeFault> {
        let (value, error) = match self.invoke(call)? {
            Ok(value) => (value, Value::Null),
            Err(error) => (Value::Null, Value::String(error.to_string())),
        };
        self.write(ok, value.clone(), span)?;
        self.write(err, error, span)?;
        Ok(value)
    }

    /// Writes to the event. Replacing the whole event requires an object.
    fn write(&mut self, path: &FieldPath, value: Value, span: Span) -> Result<(), RuntimeFault> {
        if path.is_root() && !matches!(value, Value::Object(_)) {
            return Err(RuntimeFault::type_mismatch(
                format!("event root must be an object, got {}", value.kind()),
                span,
            ));
        }
        self.target
            .insert(path, value)
            .map(|_| ())
            .map_err(|err| path_fault(err, span))
    }

    /// Evaluates a call outside of a two-target assignment.
    fn evaluate_call(&mut self, call: &Call, span: Span) -> Result<Value, RuntimeFault> {
        match self.invoke(call)? {
            Ok(value) => Ok(value),
            Err(cause) if call.abort_on_error => Err(RuntimeFault::AbortedFallibleCall {
                function: call.function.name.to_string(),
                cause,
                span: Some(span),
            }),
            Err(cause) => Err(function_fault(call.function.name, cause, span)),
        }
    }

    /// Evaluates the arguments and calls the built-in. The outer error is a
    /// fault raised while evaluating arguments; the inner one is the
    /// function's own failure.
    fn invoke(&mut self, call: &Call) -> Result<Result<Value, FunctionError>, RuntimeFault> {
        match call.function.implementation {
            Implementation::MutateRoot(mutate) => {
                let Some(CallArgument::Path(path)) = call.arguments.first() else {
                    return Ok(Err(FunctionError::InvalidArgument(format!(
                        "{} requires a field path argument",
                        call.function.name
                    ))));
                };
                Ok(Ok(mutate(&mut *self.target, path)))
            }
            Implementation::Pure(function) => {
                let arguments = self.evaluate_arguments(&call.arguments)?;
                let ctx = CallContext {
                    root: &*self.target,
                    timezone: &self.timezone,
                };
                Ok(function(&ctx, &arguments))
            }
        }
    }

    /// Root paths keep their presence so functions can tell absent from null.
    fn evaluate_arguments(&mut self, arguments: &[CallArgument]) -> Result<Arguments, RuntimeFault> {
        let mut evaluated = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let argument = match argument {
                CallArgument::Path(path)
                | CallArgument::Value(Node {
                    kind: NodeKind::Path(path),
                    ..
                }) => Argument::from_path(path.clone(), self.target.get(path).cloned()),
                CallArgument::Value(node) => Argument::value(self.evaluate(node)?),
            };
            evaluated.push(argument);
        }
        Ok(Arguments::new(evaluated))
    }

    /// Evaluates binary operations; `&&` and `||` short-circuit.
    fn evaluate_binary_op(
        &mut self,
        operator: BinaryOperator,
        left: &Node,
        right: &Node,
        span: Span,
    ) -> Result<Value, RuntimeFault> {
        match operator {
            BinaryOperator::And | BinaryOperator::Or => {
                let left = self.evaluate_boolean(left, operator)?;
                if (operator == BinaryOperator::And) != left {
                    return Ok(Value::Boolean(left));
                }
                Ok(Value::Boolean(self.evaluate_boolean(right, operator)?))
            }
            _ => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                operators::apply_binary(operator, left, right, span)
            }
        }
    }

    fn evaluate_boolean(
        &mut self,
        node: &Node,
        operator: BinaryOperator,
    ) -> Result<bool, RuntimeFault> {
        match self.evaluate(node)? {
            Value::Boolean(b) => Ok(b),
            other => Err(RuntimeFault::type_mismatch(
                format!("operand of `{}` must be a boolean, got {}", operator, other.kind()),
                node.span,
            )),
        }
    }

    /// Evaluates unary operations.
    fn evaluate_unary_op(
        &mut self,
        operator: UnaryOperator,
        operand: &Node,
        span: Span,
    ) -> Result<Value, RuntimeFault> {
        let value = self.evaluate(operand)?;
        operators::apply_unary(operator, value, span)
    }

    /// Evaluates if-else expressions.
    fn evaluate_if_else(
        &mut self,
        condition: &Node,
        consequent: &[Node],
        alternative: Option<&Node>,
    ) -> Result<Value, RuntimeFault> {
        match self.evaluate(condition)? {
            Value::Boolean(true) => self.evaluate_statements(consequent),
            Value::Boolean(false) => match alternative {
                Some(alternative) => self.evaluate(alternative),
                None => Ok(Value::Null),
            },
            other => Err(RuntimeFault::type_mismatch(
                format!("if condition must be a boolean, got {}", other.kind()),
                condition.span,
            )),
        }
    }
}

/// Maps a failed write to the fault class callers see.
fn path_fault(err: PathError, span: Span) -> RuntimeFault {
    let message = err.to_string();
    let span = Some(span);
    match err {
        PathError::MissingArray { .. } => RuntimeFault::MissingField { message, span },
        PathError::IndexOutOfRange { .. } => RuntimeFault::IndexOutOfRange { message, span },
        PathError::NotAnObject { .. } | PathError::NotAnArray { .. } => {
            RuntimeFault::TypeMismatch { message, span }
        }
    }
}

/// Converts an unexpected failure of a call the compiler accepted without a
/// handler.
fn function_fault(function: &str, cause: FunctionError, span: Span) -> RuntimeFault {
    let message = format!("{}: {}", function, cause);
    let span = Some(span);
    match cause {
        FunctionError::TypeMismatch { .. } => RuntimeFault::TypeMismatch { message, span },
        FunctionError::MissingField { .. } => RuntimeFault::MissingField { message, span },
        FunctionError::InvalidArgument(_) => RuntimeFault::InvalidArgument { message, span },
        FunctionError::ConversionFailure(_) => RuntimeFault::ConversionFailure { message, span },
    }
}
