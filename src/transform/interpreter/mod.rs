//! Interpreter module for remap programs.
//!
//! Evaluates a compiled [`Program`](crate::transform::Program) against one
//! mutable event.

// Module declarations
pub mod engine;
pub mod operators;

#[cfg(test)]
mod tests;

// Public re-exports for the main API
pub use engine::Interpreter;
