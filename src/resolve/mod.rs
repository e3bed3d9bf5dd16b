//! Cross-file resolution of an entry file's export surface.
//!
//! Re-export edges (`module.exports = require('./x')` and friends) are
//! followed across files until every reachable module has been analyzed
//! once. The union of their exports, restricted to valid identifiers, is the
//! entry's export surface.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use exportscope::resolve::parse_entry_file;
//!
//! let result = parse_entry_file(Path::new("/project/node_modules/lib/index.js"))?;
//! println!("{:?}", result.exports);
//! ```

mod entry;
mod host;
mod names;

pub use entry::{
    global_cache, parse_entry_file, reset_entry_cache, EntryCache, EntryError, EntryExports,
    EntryResult, ExportResolver,
};
pub use host::{ModuleHost, NodeHost, ResolveError, ResolveOptions, ResolveResult};
pub use names::is_valid_export_name;
