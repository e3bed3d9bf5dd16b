//! File access and module-specifier resolution used by the cross-file
//! resolver.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Errors that can occur while resolving a module specifier.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Cannot resolve '{specifier}' from {}", base.display())]
    NotFound { specifier: String, base: PathBuf },
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Everything the cross-file resolver needs from the outside world.
pub trait ModuleHost {
    /// Read a module's source text.
    fn read_source(&self, path: &Path) -> io::Result<String>;

    /// Resolve `specifier` as if required from a file in `base_dir`.
    fn resolve(&self, specifier: &str, base_dir: &Path) -> ResolveResult<PathBuf>;

    /// Canonical spelling of an existing path, used to key visited files.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Options for Node-style resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Extensions tried, in order, when the specifier names no existing file.
    pub extensions: Vec<String>,
    /// `package.json` fields consulted for a package's entry point.
    pub main_fields: Vec<String>,
    /// File stem looked up inside directories.
    pub index_file: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extensions: [".js", ".cjs", ".mjs", ".json", ".ts", ".cts", ".mts", ".tsx"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            main_fields: vec!["main".to_string()],
            index_file: "index".to_string(),
        }
    }
}

impl ResolveOptions {
    /// Replace the extension list. Leading dots are optional.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        self
    }

    pub fn with_main_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.main_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Host backed by the local filesystem with CommonJS resolution rules.
#[derive(Debug, Clone, Default)]
pub struct NodeHost {
    options: ResolveOptions,
}

impl NodeHost {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// `candidate` as a file, then as a directory.
    fn resolve_path(&self, candidate: &Path) -> Option<PathBuf> {
        self.resolve_file(candidate)
            .or_else(|| self.resolve_directory(candidate))
    }

    fn resolve_file(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        self.options
            .extensions
            .iter()
            .map(|ext| with_suffix(candidate, ext))
            .find(|path| path.is_file())
    }

    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Some(main) = self.package_main(dir) {
            return Some(main);
        }
        self.resolve_index(dir)
    }

    fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        self.resolve_file(&dir.join(&self.options.index_file))
    }

    /// Entry point named by the directory's `package.json`, if any.
    fn package_main(&self, dir: &Path) -> Option<PathBuf> {
        let manifest = fs::read_to_string(dir.join("package.json")).ok()?;
        let manifest: serde_json::Value = serde_json::from_str(&manifest).ok()?;
        self.options
            .main_fields
            .iter()
            .filter_map(|field| manifest.get(field).and_then(|v| v.as_str()))
            .find_map(|main| {
                let target = dir.join(main);
                self.resolve_file(&target)
                    .or_else(|| self.resolve_index(&target))
            })
    }

    /// Bare specifiers: look in every `node_modules` from `base_dir` upwards.
    fn resolve_package(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        base_dir
            .ancestors()
            .filter(|dir| dir.file_name().map(|n| n != "node_modules").unwrap_or(true))
            .map(|dir| dir.join("node_modules").join(specifier))
            .find_map(|candidate| self.resolve_path(&candidate))
    }
}

impl ModuleHost for NodeHost {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn resolve(&self, specifier: &str, base_dir: &Path) -> ResolveResult<PathBuf> {
        let found = if is_path_specifier(specifier) {
            self.resolve_path(&base_dir.join(specifier))
        } else {
            self.resolve_package(specifier, base_dir)
        };

        let found = found
            .and_then(|path| fs::canonicalize(&path).ok())
            .ok_or_else(|| ResolveError::NotFound {
                specifier: specifier.to_string(),
                base: base_dir.to_path_buf(),
            })?;
        trace!(specifier, resolved = %found.display(), "resolved specifier");
        Ok(found)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

/// Relative (`./x`, `../x`, `.`, `..`) or absolute specifiers.
fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// `foo/bar` + `.js` -> `foo/bar.js`, keeping any existing extension.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}
