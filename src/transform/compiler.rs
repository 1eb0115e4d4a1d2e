//! Resolution of a parsed AST into a [`Program`](super::program::Program).
//!
//! The compiler binds every call site to a built-in, validates arity and
//! path parameters, and enforces the fallibility discipline: a call to a
//! fallible function must either carry the abort marker (`name!(...)`) or be
//! the direct right-hand side of a two-target assignment
//! (`.value, .err = name(...)`). Every other position is rejected here,
//! before anything runs.

use super::ast::{
    Assignment, Block, Del, Expr, ExprKind, FunctionCall, IfExpr, Literal, PathExpr, PathTarget,
};
use super::builtins::{Builtin, FunctionLibrary, ParameterKind};
use super::program::{Call, CallArgument, Node, NodeKind};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};
use crate::value::{ObjectMap, Value};

pub struct Compiler<'a> {
    library: &'a FunctionLibrary,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Compiler<'a> {
    pub fn new(library: &'a FunctionLibrary) -> Self {
        Self {
            library,
            diagnostics: Vec::new(),
        }
    }

    /// Compiles top-level statements. Any diagnostic means the returned nodes
    /// must not be executed.
    pub fn compile(mut self, statements: Vec<Expr>) -> (Vec<Node>, Vec<Diagnostic>) {
        let nodes = self.compile_all(statements);
        (nodes.unwrap_or_default(), self.diagnostics)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Compiles every expression, continuing past failures so all problems
    /// are reported.
    fn compile_all(&mut self, exprs: Vec<Expr>) -> Option<Vec<Node>> {
        let mut nodes = Vec::with_capacity(exprs.len());
        let mut ok = true;
        for expr in exprs {
            match self.compile_expr(expr) {
                Some(node) => nodes.push(node),
                None => ok = false,
            }
        }
        ok.then_some(nodes)
    }

    fn compile_expr(&mut self, expr: Expr) -> Option<Node> {
        let span = expr.span;
        let kind = match expr.kind {
            ExprKind::Literal(literal) => self.compile_literal(literal)?,
            ExprKind::Path(PathExpr {
                target: PathTarget::Root,
                path,
            }) => NodeKind::Path(path),
            ExprKind::Path(PathExpr {
                target: PathTarget::Expr(base),
                path,
            }) => NodeKind::Access {
                base: Box::new(self.compile_expr(*base)?),
                path,
            },
            ExprKind::Assignment(assignment) => self.compile_assignment(*assignment)?,
            ExprKind::FunctionCall(call) => NodeKind::Call(self.compile_call(call, span, false)?),
            ExprKind::BinaryOp {
                left,
                operator,
                right,
            } => {
                let left = self.compile_expr(*left);
                let right = self.compile_expr(*right);
                NodeKind::Binary {
                    operator,
                    left: Box::new(left?),
                    right: Box::new(right?),
                }
            }
            ExprKind::UnaryOp { operator, expr } => NodeKind::Unary {
                operator,
                operand: Box::new(self.compile_expr(*expr)?),
            },
            ExprKind::If(if_expr) => self.compile_if(if_expr)?,
            ExprKind::Block(Block { statements }) => NodeKind::Block(self.compile_all(statements)?),
            ExprKind::Del(del) => self.compile_del(del, span)?,
        };
        Some(Node::new(kind, span))
    }

    fn compile_literal(&mut self, literal: Literal) -> Option<NodeKind> {
        let constant = match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(b),
            Literal::Integer(i) => Value::Integer(i),
            Literal::Float(f) => Value::Float(f),
            Literal::String(s) => Value::String(s),
            Literal::Timestamp(ts) => Value::Timestamp(ts),
            Literal::Array(items) => {
                let nodes = self.compile_all(items)?;
                return Some(fold_array(nodes));
            }
            Literal::Object(entries) => {
                let mut compiled = Vec::with_capacity(entries.len());
                let mut ok = true;
                for (key, value) in entries {
                    match self.compile_expr(value) {
                        Some(node) => compiled.push((key, node)),
                        None => ok = false,
                    }
                }
                return ok.then(|| fold_object(compiled));
            }
        };
        Some(NodeKind::Constant(constant))
    }

    fn compile_if(&mut self, if_expr: IfExpr) -> Option<NodeKind> {
        let condition = self.compile_expr(*if_expr.condition);
        let consequent = self.compile_all(if_expr.consequent.statements);
        let alternative = match if_expr.alternative {
            Some(alternative) => Some(self.compile_expr(*alternative).map(Box::new)),
            None => None,
        };
        Some(NodeKind::If {
            condition: Box::new(condition?),
            consequent: consequent?,
            alternative: match alternative {
                Some(node) => Some(node?),
                None => None,
            },
        })
    }

    fn compile_assignment(&mut self, assignment: Assignment) -> Option<NodeKind> {
        match assignment {
            Assignment::Single { target, expr } => Some(NodeKind::Assign {
                target: target.path,
                value: Box::new(self.compile_expr(expr)?),
            }),
            Assignment::Fallible { ok, err, expr } => {
                let span = expr.span;
                match expr.kind {
                    ExprKind::FunctionCall(call) if !call.abort_on_error => {
                        let function = self.library.get(&call.name);
                        match function {
                            Some(builtin) if !builtin.fallible => {
                                self.report_unnecessary_error_assignment(span, builtin.name);
                                self.compile_call(call, span, true);
                                None
                            }
                            _ => {
                                let call = self.compile_call(call, span, true)?;
                                Some(NodeKind::AssignFallible {
                                    ok: ok.path,
                                    err: err.path,
                                    call,
                                })
                            }
                        }
                    }
                    kind => {
                        let name = match &kind {
                            ExprKind::FunctionCall(call) => call.name.clone(),
                            _ => "expression".to_string(),
                        };
                        self.report_unnecessary_error_assignment(span, &name);
                        self.compile_expr(Expr::new(kind, span));
                        None
                    }
                }
            }
        }
    }

    fn report_unnecessary_error_assignment(&mut self, span: Span, what: &str) {
        self.report(
            Diagnostic::error(
                DiagnosticCode::UnnecessaryErrorAssignment,
                "unnecessary error assignment",
                span,
            )
            .with_label(format!("this {} can't fail", describe(what)))
            .with_suggestion("assign to a single target instead"),
        );
    }

    fn resolve(&mut self, name: &str, name_span: Span) -> Option<&'static Builtin> {
        let builtin = self.library.get(name);
        if builtin.is_none() {
            let mut diagnostic = Diagnostic::error(
                DiagnosticCode::UnknownFunction,
                format!("call to undefined function `{}`", name),
                name_span,
            )
            .with_label("undefined function");
            if let Some(candidate) = self.library.suggest(name) {
                diagnostic = diagnostic.with_suggestion(format!("did you mean `{}`?", candidate));
            }
            self.report(diagnostic);
        }
        builtin
    }

    /// Compiles a call site. `handled` is true only for the direct right-hand
    /// side of a two-target assignment.
    fn compile_call(&mut self, call: FunctionCall, span: Span, handled: bool) -> Option<Call> {
        let FunctionCall {
            name,
            name_span,
            abort_on_error,
            arguments,
        } = call;
        let builtin = self.resolve(&name, name_span);

        let Some(builtin) = builtin else {
            // Still walk the arguments so nested problems surface too.
            self.compile_all(arguments);
            return None;
        };

        let mut ok = self.check_arity(builtin, arguments.len(), span);

        if builtin.fallible && !abort_on_error && !handled {
            self.report(
                Diagnostic::error(
                    DiagnosticCode::UnhandledFallibleCall,
                    format!("unhandled error from fallible function `{}`", builtin.name),
                    span,
                )
                .with_label("this function call can fail")
                .with_suggestion(format!(
                    "handle the error with `.value, .err = {name}(...)` or abort on error with `{name}!(...)`",
                    name = builtin.name
                )),
            );
            ok = false;
        }

        if abort_on_error && !builtin.fallible {
            self.report(
                Diagnostic::error(
                    DiagnosticCode::AbortInfallibleCall,
                    format!("function `{}` can't fail", builtin.name),
                    span,
                )
                .with_label("unnecessary `!`")
                .with_suggestion(format!("remove the `!` and call `{}(...)`", builtin.name)),
            );
            ok = false;
        }

        let mut compiled = Vec::with_capacity(arguments.len());
        for (index, argument) in arguments.into_iter().enumerate() {
            let kind = builtin
                .parameter(index)
                .map(|p| p.kind)
                .unwrap_or(ParameterKind::Value);
            match self.compile_argument(builtin, kind, argument) {
                Some(argument) => compiled.push(argument),
                None => ok = false,
            }
        }

        ok.then_some(Call {
            function: builtin,
            abort_on_error,
            arguments: compiled,
        })
    }

    fn check_arity(&mut self, builtin: &Builtin, supplied: usize, span: Span) -> bool {
        let within = supplied >= builtin.min_arity()
            && builtin.max_arity().map_or(true, |max| supplied <= max);
        if !within {
            self.report(
                Diagnostic::error(
                    DiagnosticCode::ArityMismatch,
                    format!(
                        "function `{}` takes {} argument{} but {} {} supplied",
                        builtin.name,
                        builtin.arity_description(),
                        if builtin.arity_description() == "1" { "" } else { "s" },
                        supplied,
                        if supplied == 1 { "was" } else { "were" }
                    ),
                    span,
                )
                .with_label("wrong number of arguments"),
            );
        }
        within
    }

    fn compile_argument(
        &mut self,
        builtin: &Builtin,
        kind: ParameterKind,
        argument: Expr,
    ) -> Option<CallArgument> {
        match kind {
            ParameterKind::Value => self.compile_expr(argument).map(CallArgument::Value),
            ParameterKind::Path => match argument.kind {
                ExprKind::Path(PathExpr {
                    target: PathTarget::Root,
                    path,
                }) => Some(CallArgument::Path(path)),
                other => {
                    self.report(
                        Diagnostic::error(
                            DiagnosticCode::PathArgumentRequired,
                            format!("function `{}` requires a field path argument", builtin.name),
                            argument.span,
                        )
                        .with_label("expected a field path such as `.field`"),
                    );
                    self.compile_expr(Expr::new(other, argument.span));
                    None
                }
            },
        }
    }

    fn compile_del(&mut self, del: Del, span: Span) -> Option<NodeKind> {
        let builtin = self.resolve("del", span)?;
        if del.abort_on_error && !builtin.fallible {
            self.report(
                Diagnostic::error(
                    DiagnosticCode::AbortInfallibleCall,
                    "function `del` can't fail",
                    span,
                )
                .with_label("unnecessary `!`")
                .with_suggestion("remove the `!` and call `del(...)`"),
            );
            return None;
        }
        Some(NodeKind::Call(Call {
            function: builtin,
            abort_on_error: del.abort_on_error,
            arguments: vec![CallArgument::Path(del.target.path)],
        }))
    }
}

fn describe(what: &str) -> String {
    if what == "expression" {
        what.to_string()
    } else {
        format!("call to `{}`", what)
    }
}

/// Collapses an array literal to a constant when every item is constant.
fn fold_array(nodes: Vec<Node>) -> NodeKind {
    if nodes.iter().all(|n| matches!(n.kind, NodeKind::Constant(_))) {
        let values = nodes
            .into_iter()
            .filter_map(|n| match n.kind {
                NodeKind::Constant(value) => Some(value),
                _ => None,
            })
            .collect();
        NodeKind::Constant(Value::Array(values))
    } else {
        NodeKind::Array(nodes)
    }
}

fn fold_object(entries: Vec<(String, Node)>) -> NodeKind {
    if entries
        .iter()
        .all(|(_, n)| matches!(n.kind, NodeKind::Constant(_)))
    {
        let map = entries
            .into_iter()
            .filter_map(|(key, n)| match n.kind {
                NodeKind::Constant(value) => Some((key, value)),
                _ => None,
            })
            .collect::<ObjectMap>();
        NodeKind::Constant(Value::Object(map))
    } else {
        NodeKind::Object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::lexer::tokenize;
    use crate::transform::parser::parse;

    fn compile(source: &str) -> (Vec<Node>, Vec<Diagnostic>) {
        let (tokens, lex) = tokenize(source);
        assert!(lex.is_empty(), "lexer diagnostics: {:?}", lex);
        let (ast, parse_diagnostics) = parse(tokens);
        assert!(parse_diagnostics.is_empty(), "parse diagnostics: {:?}", parse_diagnostics);
        Compiler::new(FunctionLibrary::standard()).compile(ast)
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        compile(source).1.into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_unhandled_fallible_call_single_target() {
        let (_, diagnostics) = compile(".parsed = parse_json(.message)");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnhandledFallibleCall);
        assert_eq!(diagnostics[0].span.map(|s| (s.start, s.end)), Some((10, 30)));
        assert!(diagnostics[0].suggestion.is_some());
    }

    #[test]
    fn test_handled_positions() {
        assert!(codes(".parsed = parse_json!(.message)").is_empty());
        assert!(codes(".parsed, .err = parse_json(.message)").is_empty());
        assert!(codes(".n = length!(parse_json!(.m))").is_empty());
    }

    #[test]
    fn test_unhandled_in_nested_positions() {
        assert_eq!(
            codes(".n = length!(parse_json(.m))"),
            vec![DiagnosticCode::UnhandledFallibleCall]
        );
        assert_eq!(
            codes("if to_bool(.flag) { .a = 1 }"),
            vec![DiagnosticCode::UnhandledFallibleCall]
        );
        assert_eq!(
            codes(".a = [to_int(.x)]"),
            vec![DiagnosticCode::UnhandledFallibleCall]
        );
        // Only the direct call of a two-target assignment is handled.
        assert_eq!(
            codes(".a, .err = push(parse_json(.m), 1)"),
            vec![DiagnosticCode::UnhandledFallibleCall]
        );
    }

    #[test]
    fn test_unnecessary_error_assignment() {
        assert_eq!(
            codes(".a, .err = now()"),
            vec![DiagnosticCode::UnnecessaryErrorAssignment]
        );
        assert_eq!(
            codes(".a, .err = parse_json!(.m)"),
            vec![DiagnosticCode::UnnecessaryErrorAssignment]
        );
        assert_eq!(
            codes(".a, .err = 1 + 2"),
            vec![DiagnosticCode::UnnecessaryErrorAssignment]
        );
    }

    #[test]
    fn test_unknown_function_with_suggestion() {
        let (_, diagnostics) = compile(".a = parse_jsn!(.m)");
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnknownFunction);
        assert_eq!(
            diagnostics[0].suggestion.as_deref(),
            Some("did you mean `parse_json`?")
        );
    }

    #[test]
    fn test_arity_and_abort_misuse() {
        assert_eq!(codes(".a = now(1)"), vec![DiagnosticCode::ArityMismatch]);
        assert_eq!(codes(".a = upcase!()"), vec![DiagnosticCode::ArityMismatch]);
        assert_eq!(codes(".a = now!()"), vec![DiagnosticCode::AbortInfallibleCall]);
        assert_eq!(codes("del!(.a)"), vec![DiagnosticCode::AbortInfallibleCall]);
        let (_, diagnostics) = compile(".a = now(1)");
        assert_eq!(
            diagnostics[0].message,
            "function `now` takes 0 arguments but 1 was supplied"
        );
    }

    #[test]
    fn test_path_parameter_requires_field_path() {
        assert_eq!(
            codes(".a = exists(\"x\")"),
            vec![DiagnosticCode::PathArgumentRequired]
        );
        assert!(codes(".a = exists(.x.y)").is_empty());
    }

    #[test]
    fn test_all_problems_reported_in_one_pass() {
        let source = ".a = parse_json(.m)\n.b = nope(1)\n.c = to_int(.x) + to_int(.y)";
        assert_eq!(
            codes(source),
            vec![
                DiagnosticCode::UnhandledFallibleCall,
                DiagnosticCode::UnknownFunction,
                DiagnosticCode::UnhandledFallibleCall,
                DiagnosticCode::UnhandledFallibleCall,
            ]
        );
    }

    #[test]
    fn test_constant_literals_fold() {
        let (nodes, diagnostics) = compile(".a = [1, \"x\", {\"k\": null}]");
        assert!(diagnostics.is_empty());
        let NodeKind::Assign { value, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, NodeKind::Constant(Value::Array(_))));
    }

    #[test]
    fn test_del_binds_to_builtin() {
        let (nodes, diagnostics) = compile(".old = del(.a)");
        assert!(diagnostics.is_empty());
        let NodeKind::Assign { value, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        let NodeKind::Call(call) = &value.kind else {
            panic!("expected call");
        };
        assert_eq!(call.function.name, "del");
    }
}
