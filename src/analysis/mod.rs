//! Export-surface analysis of a single source unit.
//!
//! This module recognizes the structural idioms CommonJS and UMD modules use
//! to populate their exports, without executing anything.
//!
//! # Recognized idioms
//!
//! - `exports.foo = …`, `module.exports.foo = …`, `exports['foo'] = …`
//! - `module.exports = require('./foo')` (wholesale re-export)
//! - `module.exports = { a, b: c, ...require('./d') }`
//! - `Object.defineProperty(exports, 'foo', { … })`
//! - `__exportStar(require('./foo'), exports)` and compiled `export *` loops
//! - factory wrappers `(function (e) { … })(exports)` and UMD wrappers
//!
//! # Example
//!
//! ```
//! use exportscope::analysis::parse_unit;
//!
//! let result = parse_unit("exports.a = 1; module.exports.b = require('./b');").unwrap();
//! assert_eq!(result.exports, vec!["a", "b"]);
//! assert!(result.reexports.is_empty());
//! ```

pub mod idioms;
mod parse;
mod sink;
mod visitor;

pub use parse::{
    parse_json_module, parse_unit, AnalysisError, AnalysisResult, ExportAnalyzer, SourceLanguage,
};
pub use sink::{CollectedExports, ExportSink, ModuleExports};
pub use visitor::ExportVisitor;
