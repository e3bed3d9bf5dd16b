//! ExportScope - static export-surface analyzer for CommonJS and UMD modules
//!
//! This crate determines which names a JavaScript module exports, and which
//! modules it re-exports wholesale, by pattern-matching its syntax tree.

pub mod analysis;
pub mod report;
pub mod resolve;

pub use analysis::{parse_unit, ModuleExports};
pub use resolve::{parse_entry_file, EntryExports};
