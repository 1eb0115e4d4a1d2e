//! # EventFold
//!
//! A runtime for a small, expression-oriented remap language that transforms
//! structured event records in place.
//!
//! ## Core Components
//!
//! * `value` - The closed value model events are made of, plus field paths
//! * `transform` - Lexer, parser, compiler, built-ins and interpreter
//! * `diagnostic` - Source-located problem reports and their rendering
//! * `runtime` - Configuration, the compilation cache and execution entry points
//! * `error` - Error types and handling
//! * `logging` - `env_logger` setup for binaries and tests
//!
//! ## Architecture
//!
//! Source text is compiled once into an immutable [`Program`]. Compilation
//! collects every problem it finds into a [`DiagnosticSet`]; a program with
//! any diagnostic never runs. In particular, every call to a function that
//! can fail must be handled at the call site, either by aborting
//! (`parse_json!(.raw)`) or by capturing the error
//! (`.parsed, .err = parse_json(.raw)`).
//!
//! Compiled programs are cached by source text and can be executed
//! concurrently against independent events.
//!
//! ```
//! use eventfold::{Runtime, RuntimeConfig, Value};
//!
//! let runtime = Runtime::new(RuntimeConfig::new(Some("UTC")).unwrap());
//! let event = Value::from_json_str(r#"{"message": "{\"status\": 200}"}"#).unwrap();
//! let outcome = runtime
//!     .run(".status = parse_json!(.message).status\ndel(.message)", event)
//!     .unwrap();
//! assert_eq!(outcome.event.to_json(), serde_json::json!({"status": 200}));
//! ```

pub mod diagnostic;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod transform;
pub mod value;

// Re-export main types for convenience
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSet, Span};
pub use error::{FaultKind, RemapError, RemapResult, RuntimeFault};
pub use runtime::{
    execute, execute_in_place, CacheStats, ConfigError, ExecutionOutcome, ProgramCache, Runtime,
    RuntimeConfig, TimeZone,
};
pub use transform::{compile, Program};
pub use value::{FieldPath, Kind, Value};
