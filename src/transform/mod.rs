//! # Remap Language
//!
//! Compilation pipeline for remap programs.
//!
//! ## Components
//!
//! * `lexer` - Turns source text into tokens, recovering at line boundaries
//! * `parser` - Builds an AST, recovering at statement boundaries
//! * `compiler` - Resolves functions and enforces the fallibility rules
//! * `interpreter` - Executes a compiled [`Program`] against one event
//! * `builtins` - The standard function library
//!
//! Every stage collects diagnostics instead of stopping at the first one.
//! Resolution only runs on a program that lexed and parsed cleanly.

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod token;

pub use builtins::{Builtin, FunctionError, FunctionLibrary};
pub use compiler::Compiler;
pub use interpreter::Interpreter;
pub use program::Program;

use crate::diagnostic::DiagnosticSet;
use log::debug;

/// Compiles source text against the standard library.
pub fn compile(source: &str) -> Result<Program, DiagnosticSet> {
    compile_with(source, FunctionLibrary::standard())
}

/// Compiles source text against a specific function library.
pub fn compile_with(source: &str, library: &FunctionLibrary) -> Result<Program, DiagnosticSet> {
    let (tokens, mut diagnostics) = lexer::tokenize(source);
    let (statements, parse_diagnostics) = parser::parse(tokens);
    diagnostics.extend(parse_diagnostics);
    if !diagnostics.is_empty() {
        debug!(
            "Program rejected during parsing with {} diagnostic(s)",
            diagnostics.len()
        );
        return Err(DiagnosticSet::from_diagnostics(source, diagnostics));
    }

    let (nodes, diagnostics) = Compiler::new(library).compile(statements);
    if !diagnostics.is_empty() {
        debug!(
            "Program rejected during resolution with {} diagnostic(s)",
            diagnostics.len()
        );
        return Err(DiagnosticSet::from_diagnostics(source, diagnostics));
    }

    debug!("Compiled program with {} statement(s)", nodes.len());
    Ok(Program::new(source, nodes))
}
