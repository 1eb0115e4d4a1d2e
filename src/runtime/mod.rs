//! Execution entry points.
//!
//! [`execute`] runs an already compiled program. [`Runtime`] bundles a
//! configuration with a [`ProgramCache`] and offers the compile-or-reuse
//! convenience used by embedders.

pub mod cache;
pub mod config;

pub use cache::{CacheStats, ProgramCache};
pub use config::{ConfigError, RuntimeConfig, TimeZone};

use crate::diagnostic::DiagnosticSet;
use crate::error::{RemapResult, RuntimeFault};
use crate::transform::{self, Interpreter, Program};
use crate::value::Value;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Instant;

/// Cache shared by every [`Runtime::new`] in the process.
static SHARED_CACHE: Lazy<Arc<ProgramCache>> = Lazy::new(|| Arc::new(ProgramCache::new()));

/// Result of one successful execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// The transformed event
    pub event: Value,
    /// Value of the last top-level statement
    pub result: Value,
    /// Wall-clock duration of the execution in milliseconds
    pub elapsed_ms: f64,
}

/// Runs `program` against `event`, taking ownership of it.
///
/// On a fault the event is dropped. Use [`execute_in_place`] to keep the
/// partially transformed event.
pub fn execute(
    program: &Program,
    mut event: Value,
    config: &RuntimeConfig,
) -> Result<ExecutionOutcome, RuntimeFault> {
    let (result, elapsed_ms) = execute_in_place(program, &mut event, config)?;
    Ok(ExecutionOutcome {
        event,
        result,
        elapsed_ms,
    })
}

/// Runs `program` against a caller-owned event and returns the value of the
/// last statement with the elapsed milliseconds.
///
/// Writes made by statements that completed before a fault stay in `event`.
pub fn execute_in_place(
    program: &Program,
    event: &mut Value,
    config: &RuntimeConfig,
) -> Result<(Value, f64), RuntimeFault> {
    let started = Instant::now();
    let outcome = Interpreter::new(event, config.timezone).run(program);
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(result) => {
            debug!("Program executed in {:.3}ms", elapsed_ms);
            Ok((result, elapsed_ms))
        }
        Err(fault) => {
            warn!(
                "Program execution failed after {:.3}ms: {}",
                elapsed_ms, fault
            );
            Err(fault)
        }
    }
}

/// A configured runtime with a compilation cache.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: RuntimeConfig,
    cache: Arc<ProgramCache>,
}

impl Runtime {
    /// Creates a runtime backed by the process-wide cache.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_cache(config, Arc::clone(&SHARED_CACHE))
    }

    /// Creates a runtime backed by a caller-provided cache.
    pub fn with_cache(config: RuntimeConfig, cache: Arc<ProgramCache>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ProgramCache> {
        &self.cache
    }

    /// Compiles without touching the cache.
    pub fn compile(&self, source: &str) -> Result<Program, DiagnosticSet> {
        transform::compile(source)
    }

    pub fn execute(&self, program: &Program, event: Value) -> Result<ExecutionOutcome, RuntimeFault> {
        execute(program, event, &self.config)
    }

    /// Looks up or compiles `source`, then executes it against `event`.
    pub fn run(&self, source: &str, event: Value) -> RemapResult<ExecutionOutcome> {
        let program = self.cache.get_or_compile(source)?;
        Ok(self.execute(&program, event)?)
    }

    /// Like [`Runtime::run`], but transforms `event` where it lives and
    /// returns the value of the last statement. After a fault `event` holds
    /// every write made before it.
    pub fn run_in_place(&self, source: &str, event: &mut Value) -> RemapResult<Value> {
        let program = self.cache.get_or_compile(source)?;
        let (result, _) = execute_in_place(&program, event, &self.config)?;
        Ok(result)
    }

    /// Returns the diagnostics for `source`, or `None` if it compiles.
    pub fn check_syntax(&self, source: &str) -> Option<DiagnosticSet> {
        self.compile(source).err()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
