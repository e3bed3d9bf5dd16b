//! Accumulators for the exports a traversal discovers.

use indexmap::IndexSet;
use serde::Serialize;

/// Receiver for export-surface mutations, in the order the visitor finds them.
///
/// `clear_exports` and `clear_reexports` discard what has been accumulated
/// so far; later additions are kept. That is how a wholesale
/// `module.exports = …` erases exports set before it.
pub trait ExportSink {
    /// Record an exported name. Adding a name twice is a no-op.
    fn add_export(&mut self, name: &str);

    /// Forget an exported name, if present.
    fn remove_export(&mut self, name: &str);

    /// Forget every exported name recorded so far.
    fn clear_exports(&mut self);

    /// Record a module whose whole export surface is forwarded.
    fn add_reexport(&mut self, specifier: &str);

    /// Forget every re-export recorded so far.
    fn clear_reexports(&mut self);

    /// Called exactly once when the traversal of a unit ends, whether or not
    /// it succeeded.
    fn finalize(&mut self) {}
}

/// Final export surface of a single unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleExports {
    /// Exported names, in first-insertion order.
    pub exports: Vec<String>,
    /// Re-exported module specifiers, in first-insertion order.
    pub reexports: Vec<String>,
}

/// In-memory sink with set semantics and insertion order.
#[derive(Debug, Clone, Default)]
pub struct CollectedExports {
    exports: IndexSet<String>,
    reexports: IndexSet<String>,
}

impl CollectedExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(String::as_str)
    }

    pub fn reexports(&self) -> impl Iterator<Item = &str> {
        self.reexports.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty() && self.reexports.is_empty()
    }

    pub fn into_module_exports(self) -> ModuleExports {
        ModuleExports {
            exports: self.exports.into_iter().collect(),
            reexports: self.reexports.into_iter().collect(),
        }
    }
}

impl ExportSink for CollectedExports {
    fn add_export(&mut self, name: &str) {
        if !self.exports.contains(name) {
            self.exports.insert(name.to_string());
        }
    }

    fn remove_export(&mut self, name: &str) {
        // shift_remove keeps the remaining names in insertion order
        self.exports.shift_remove(name);
    }

    fn clear_exports(&mut self) {
        self.exports.clear();
    }

    fn add_reexport(&mut self, specifier: &str) {
        if !self.reexports.contains(specifier) {
            self.reexports.insert(specifier.to_string());
        }
    }

    fn clear_reexports(&mut self) {
        self.reexports.clear();
    }
}
