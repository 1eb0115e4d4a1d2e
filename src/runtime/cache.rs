//! Compilation cache keyed by exact source text.

use crate::diagnostic::DiagnosticSet;
use crate::transform::{self, Program};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Map from source text to its compiled program.
///
/// Lookups take a read lock. Compilation on a miss happens outside any lock;
/// if two callers race on the same source, the first insert wins and both
/// receive that program. There is no eviction besides [`ProgramCache::clear`].
#[derive(Debug, Default)]
pub struct ProgramCache {
    /// Maps source text to the compiled program
    programs: RwLock<HashMap<String, Arc<Program>>>,

    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // Programs are immutable once inserted, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Program>>> {
        self.programs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Program>>> {
        self.programs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached program for `source` without compiling.
    pub fn get(&self, source: &str) -> Option<Arc<Program>> {
        self.read().get(source).cloned()
    }

    /// Returns the cached program for `source`, compiling and inserting it on
    /// a miss. Sources that fail to compile are not cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Program>, DiagnosticSet> {
        if let Some(program) = self.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Program cache hit ({} bytes of source)", source.len());
            return Ok(program);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Program cache miss ({} bytes of source)", source.len());
        let compiled = Arc::new(transform::compile(source)?);

        let mut programs = self.write();
        let program = programs
            .entry(source.to_string())
            .or_insert_with(|| {
                debug!("Inserted program into cache");
                compiled
            })
            .clone();
        Ok(program)
    }

    /// Evicts every entry. Later calls recompile.
    pub fn clear(&self) {
        let mut programs = self.write();
        let evicted = programs.len();
        programs.clear();
        info!("Cleared program cache ({} entries evicted)", evicted);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
