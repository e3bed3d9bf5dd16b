//! Cross-file export resolution.
//!
//! Starting from an entry file, every module it re-exports wholesale is
//! analyzed too, round by round, until no new files turn up. All visited
//! files contribute to one export list. Results are cached per entry path
//! for the life of the process.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::host::{ModuleHost, NodeHost, ResolveError};
use super::names::is_valid_export_name;
use crate::analysis::{
    parse_json_module, AnalysisError, CollectedExports, ExportAnalyzer, ExportSink, SourceLanguage,
};

/// Errors that can occur while resolving an entry file's exports.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("Entry path must be absolute: {}", .0.display())]
    InvalidArgument(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to analyze {}: {source}", path.display())]
    Analysis {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },

    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error("Failed to initialize analyzer: {0}")]
    Init(#[source] AnalysisError),
}

/// Result type for entry resolution.
pub type EntryResult<T> = Result<T, EntryError>;

/// Complete export surface of an entry file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryExports {
    pub exports: Vec<String>,
}

/// Finalized export lists keyed by entry path. Entries are written once and
/// never invalidated.
#[derive(Debug, Default)]
pub struct EntryCache {
    entries: Mutex<HashMap<PathBuf, Vec<String>>>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entry: &Path) -> Option<Vec<String>> {
        self.entries.lock().get(entry).cloned()
    }

    /// Store `exports` unless the entry is already cached, and return what
    /// the cache holds afterwards.
    pub fn insert(&self, entry: PathBuf, exports: Vec<String>) -> Vec<String> {
        self.entries.lock().entry(entry).or_insert(exports).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

static GLOBAL_CACHE: Lazy<Arc<EntryCache>> = Lazy::new(|| Arc::new(EntryCache::new()));

/// The process-wide cache used by [`parse_entry_file`].
pub fn global_cache() -> Arc<EntryCache> {
    Arc::clone(&GLOBAL_CACHE)
}

/// Forget every cached entry result.
pub fn reset_entry_cache() {
    GLOBAL_CACHE.clear();
}

/// Worklist state of one resolution.
#[derive(Debug, Default)]
struct Crawl {
    pending: IndexSet<PathBuf>,
    visited: HashSet<PathBuf>,
    exports: IndexSet<String>,
}

impl Crawl {
    fn enqueue(&mut self, path: PathBuf) {
        if !self.visited.contains(&path) {
            self.pending.insert(path);
        }
    }

    /// Move `path` from pending to visited and publish its exports.
    fn settle(&mut self, path: &Path, exports: impl Iterator<Item = String>) {
        self.pending.shift_remove(path);
        self.visited.insert(path.to_path_buf());
        for name in exports {
            self.exports.insert(name);
        }
    }
}

/// Sink for one file of a crawl. Clears only reach what this file recorded;
/// the shared result sees the file's surviving exports once it finalizes.
struct FileScope<'c> {
    path: &'c Path,
    collected: CollectedExports,
    crawl: &'c mut Crawl,
}

impl<'c> FileScope<'c> {
    fn new(path: &'c Path, crawl: &'c mut Crawl) -> Self {
        Self {
            path,
            collected: CollectedExports::new(),
            crawl,
        }
    }

    fn into_reexports(self) -> Vec<String> {
        self.collected.into_module_exports().reexports
    }
}

impl ExportSink for FileScope<'_> {
    fn add_export(&mut self, name: &str) {
        self.collected.add_export(name);
    }

    fn remove_export(&mut self, name: &str) {
        self.collected.remove_export(name);
    }

    fn clear_exports(&mut self) {
        self.collected.clear_exports();
    }

    fn add_reexport(&mut self, specifier: &str) {
        self.collected.add_reexport(specifier);
    }

    fn clear_reexports(&mut self) {
        self.collected.clear_reexports();
    }

    fn finalize(&mut self) {
        let exports: Vec<String> = self.collected.exports().map(str::to_string).collect();
        self.crawl.settle(self.path, exports.into_iter());
    }
}

/// Resolves entry files to their complete export surface.
pub struct ExportResolver<H: ModuleHost = NodeHost> {
    host: H,
    analyzer: ExportAnalyzer,
    cache: Arc<EntryCache>,
}

impl ExportResolver<NodeHost> {
    /// Resolver over the local filesystem, sharing the process-wide cache.
    pub fn new() -> EntryResult<Self> {
        Self::with_host(NodeHost::default())
    }
}

impl<H: ModuleHost> ExportResolver<H> {
    pub fn with_host(host: H) -> EntryResult<Self> {
        Self::with_cache(host, global_cache())
    }

    pub fn with_cache(host: H, cache: Arc<EntryCache>) -> EntryResult<Self> {
        Ok(Self {
            host,
            analyzer: ExportAnalyzer::new().map_err(EntryError::Init)?,
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<EntryCache> {
        &self.cache
    }

    /// Export names of `entry` and of every module it re-exports,
    /// transitively. `entry` must be absolute.
    pub fn parse_entry_file(&mut self, entry: &Path) -> EntryResult<EntryExports> {
        if !entry.is_absolute() {
            return Err(EntryError::InvalidArgument(entry.to_path_buf()));
        }
        if let Some(exports) = self.cache.get(entry) {
            debug!(entry = %entry.display(), "entry cache hit");
            return Ok(EntryExports { exports });
        }

        let exports = self.crawl(entry)?;
        let exports = self.cache.insert(entry.to_path_buf(), exports);
        Ok(EntryExports { exports })
    }

    fn crawl(&mut self, entry: &Path) -> EntryResult<Vec<String>> {
        let start = self.host.canonicalize(entry).map_err(|source| EntryError::Io {
            path: entry.to_path_buf(),
            source,
        })?;

        let mut crawl = Crawl::default();
        crawl.enqueue(start);

        let mut round = 0;
        while !crawl.pending.is_empty() {
            round += 1;
            // Files discovered during this round wait for the next one.
            let frontier: Vec<PathBuf> = crawl.pending.iter().cloned().collect();
            debug!(round, files = frontier.len(), "re-export round");

            for path in &frontier {
                let reexports = self.visit_file(path, &mut crawl)?;
                let base = path.parent().unwrap_or(path);
                for specifier in reexports {
                    let target = self.resolve_target(&specifier, base)?;
                    crawl.enqueue(target);
                }
            }
        }

        debug!(
            entry = %entry.display(),
            files = crawl.visited.len(),
            "entry resolved"
        );
        Ok(crawl
            .exports
            .into_iter()
            .filter(|name| is_valid_export_name(name))
            .collect())
    }

    /// Analyze one file into the crawl; returns its re-export specifiers.
    fn visit_file(&mut self, path: &Path, crawl: &mut Crawl) -> EntryResult<Vec<String>> {
        let source = self.host.read_source(path).map_err(|source| EntryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(file = %path.display(), "analyzing");

        let mut scope = FileScope::new(path, crawl);
        let analyzed = if is_json_module(path) {
            let parsed = parse_json_module(&source).map(|module| {
                for name in &module.exports {
                    scope.add_export(name);
                }
            });
            scope.finalize();
            parsed
        } else {
            self.analyzer
                .analyze(&source, SourceLanguage::from_path(path), &mut scope)
        };
        let reexports = scope.into_reexports();

        analyzed.map_err(|source| EntryError::Analysis {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(reexports)
    }

    fn resolve_target(&self, specifier: &str, base: &Path) -> EntryResult<PathBuf> {
        let candidate = Path::new(specifier);
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }
        Ok(self.host.resolve(specifier, base)?)
    }
}

fn is_json_module(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Export names of the absolute path `entry` and everything it re-exports,
/// using the filesystem and the process-wide cache.
pub fn parse_entry_file(entry: &Path) -> EntryResult<EntryExports> {
    ExportResolver::new()?.parse_entry_file(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Resolver with its own cache, so tests never observe each other.
    fn resolver() -> ExportResolver {
        ExportResolver::with_cache(NodeHost::default(), Arc::new(EntryCache::new())).unwrap()
    }

    fn exports_of(entry: &Path) -> Vec<String> {
        resolver().parse_entry_file(entry).unwrap().exports
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "exports.a = 1; exports.b = 2;");
        assert_eq!(exports_of(&entry), vec!["a", "b"]);
    }

    #[test]
    fn test_sibling_reexports_union() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "module.exports = { ...require('./a'), ...require('./b') };",
        );
        write(dir.path(), "a.js", "exports.x = 1;");
        write(dir.path(), "b.js", "exports.y = 1;");

        assert_eq!(exports_of(&entry), vec!["x", "y"]);
    }

    #[test]
    fn test_transitive_reexport_chain() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "exports.top = 1;\n__exportStar(require('./lib/mid'), exports);",
        );
        write(dir.path(), "lib/mid.js", "exports.mid = 1;\nmodule.exports = require('../leaf');");
        write(dir.path(), "leaf/index.js", "exports.leaf = 1;");

        assert_eq!(exports_of(&entry), vec!["top", "leaf"]);
    }

    #[test]
    fn test_files_found_mid_round_wait_for_next_round() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "exports.entry = 1;\n__export(require('./a'));\n__export(require('./b'));",
        );
        write(dir.path(), "a.js", "exports.a = 1;\n__export(require('./c'));");
        write(dir.path(), "b.js", "exports.b = 1;");
        write(dir.path(), "c.js", "exports.c = 1;");

        // breadth first: c is only discovered while a is analyzed
        assert_eq!(exports_of(&entry), vec!["entry", "a", "b", "c"]);
    }

    #[test]
    fn test_reexport_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "a.js",
            r#"
Object.defineProperty(exports, "__esModule", { value: true });
exports.a = 1;
__exportStar(require("./b"), exports);
"#,
        );
        write(
            dir.path(),
            "b.js",
            r#"
exports.b = 2;
__exportStar(require("./a"), exports);
"#,
        );

        assert_eq!(exports_of(&entry), vec!["__esModule", "a", "b"]);
    }

    #[test]
    fn test_clear_in_reexported_file_keeps_entry_exports() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "exports.own = 1;\n__exportStar(require('./b'), exports);",
        );
        write(
            dir.path(),
            "b.js",
            "exports.gone = 1;\nconst kept = 2;\nmodule.exports = { kept };",
        );

        assert_eq!(exports_of(&entry), vec!["own", "kept"]);
    }

    #[test]
    fn test_invalid_names_filtered() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "exports['kebab-case'] = 1;\nexports.ok = 1;\nexports.default = 2;",
        );
        assert_eq!(exports_of(&entry), vec!["ok"]);
    }

    #[test]
    fn test_json_reexport() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "module.exports = require('./data.json');");
        write(dir.path(), "data.json", r#"{"version": "1.0.0", "name": "x"}"#);

        assert_eq!(exports_of(&entry), vec!["version", "name"]);
    }

    #[test]
    fn test_package_reexport() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "src/index.js", "module.exports = require('pkg');");
        write(dir.path(), "node_modules/pkg/package.json", r#"{"main": "main.js"}"#);
        write(dir.path(), "node_modules/pkg/main.js", "exports.fromPackage = 1;");

        assert_eq!(exports_of(&entry), vec!["fromPackage"]);
    }

    #[test]
    fn test_idempotent_and_cached() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "exports.a = 1;\nexports.b = 2;");

        let mut resolver = resolver();
        let first = resolver.parse_entry_file(&entry).unwrap();
        assert_eq!(resolver.cache().len(), 1);

        // Served from the cache: the rewrite is never read.
        fs::write(&entry, "exports.changed = 1;").unwrap();
        let second = resolver.parse_entry_file(&entry).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.exports, vec!["a", "b"]);

        resolver.cache().clear();
        let third = resolver.parse_entry_file(&entry).unwrap();
        assert_eq!(third.exports, vec!["changed"]);
    }

    #[test]
    fn test_cache_is_shared_between_resolvers() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "exports.a = 1;");
        let cache = Arc::new(EntryCache::new());

        ExportResolver::with_cache(NodeHost::default(), Arc::clone(&cache))
            .unwrap()
            .parse_entry_file(&entry)
            .unwrap();
        fs::write(&entry, "exports.b = 1;").unwrap();

        let exports = ExportResolver::with_cache(NodeHost::default(), cache)
            .unwrap()
            .parse_entry_file(&entry)
            .unwrap()
            .exports;
        assert_eq!(exports, vec!["a"]);
    }

    #[test]
    fn test_process_wide_cache_and_reset() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "global-cache/index.js", "exports.before = 1;");

        assert_eq!(parse_entry_file(&entry).unwrap().exports, vec!["before"]);
        assert_eq!(global_cache().get(&entry), Some(vec!["before".to_string()]));

        fs::write(&entry, "exports.after = 1;").unwrap();
        assert_eq!(parse_entry_file(&entry).unwrap().exports, vec!["before"]);

        reset_entry_cache();
        assert!(global_cache().get(&entry).is_none());
        assert_eq!(parse_entry_file(&entry).unwrap().exports, vec!["after"]);
    }

    #[test]
    fn test_relative_entry_rejected() {
        let err = resolver()
            .parse_entry_file(Path::new("relative/index.js"))
            .unwrap_err();
        assert!(matches!(err, EntryError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_entry_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = resolver()
            .parse_entry_file(&dir.path().join("missing.js"))
            .unwrap_err();
        assert!(matches!(err, EntryError::Io { .. }));
    }

    #[test]
    fn test_unreadable_absolute_reexport_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nowhere.js");
        let entry = write(
            dir.path(),
            "index.js",
            &format!("module.exports = require({:?});", missing.display().to_string()),
        );

        let err = resolver().parse_entry_file(&entry).unwrap_err();
        assert!(matches!(err, EntryError::Io { ref path, .. } if path == &missing));
    }

    #[test]
    fn test_unresolvable_reexport_aborts() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "exports.a = 1;\nmodule.exports = require('./gone');");

        let err = resolver().parse_entry_file(&entry).unwrap_err();
        assert!(matches!(err, EntryError::Resolution(ResolveError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_reexported_file_aborts() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "module.exports = require('./broken');");
        write(dir.path(), "broken.js", "exports.a = ;");

        let mut resolver = resolver();
        let err = resolver.parse_entry_file(&entry).unwrap_err();
        assert!(matches!(err, EntryError::Analysis { .. }));
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_settle_moves_pending_to_visited() {
        let mut crawl = Crawl::default();
        let path = PathBuf::from("/a.js");
        crawl.enqueue(path.clone());
        crawl.settle(&path, vec!["x".to_string()].into_iter());

        assert!(crawl.pending.is_empty());
        assert!(crawl.visited.contains(&path));

        crawl.enqueue(path);
        assert!(crawl.pending.is_empty());
    }
}
