//! Parsing front end: source text in, export surface out.
//!
//! [`ExportAnalyzer`] owns the tree-sitter parsers, turns source text into a
//! tree, rejects malformed units and runs one [`ExportVisitor`] pass over the
//! rest.

use std::path::Path;

use thiserror::Error;
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

use super::sink::{CollectedExports, ExportSink, ModuleExports};
use super::visitor::ExportVisitor;

/// Errors that can occur during export analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Syntax error at line {line}, column {column}")]
    Parse { line: usize, column: usize },

    #[error("Invalid JSON module: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tree-sitter language initialization failed")]
    LanguageInit,
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Language type for file analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceLanguage {
    #[default]
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    /// Determine language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    /// Language for a path; anything unrecognized is read as JavaScript.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }

    /// Get tree-sitter language for this source language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Analyzer for extracting the export surface of source units.
pub struct ExportAnalyzer {
    js_parser: Parser,
    ts_parser: Parser,
    tsx_parser: Parser,
}

impl ExportAnalyzer {
    /// Create a new ExportAnalyzer.
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            js_parser: parser_for(SourceLanguage::JavaScript)?,
            ts_parser: parser_for(SourceLanguage::TypeScript)?,
            tsx_parser: parser_for(SourceLanguage::Tsx)?,
        })
    }

    /// Analyze one JavaScript unit in isolation.
    pub fn parse_unit(&mut self, source: &str) -> AnalysisResult<ModuleExports> {
        self.parse_unit_as(source, SourceLanguage::JavaScript)
    }

    /// Analyze one unit of the given language in isolation.
    pub fn parse_unit_as(
        &mut self,
        source: &str,
        language: SourceLanguage,
    ) -> AnalysisResult<ModuleExports> {
        let mut sink = CollectedExports::new();
        self.analyze(source, language, &mut sink)?;
        Ok(sink.into_module_exports())
    }

    /// Run one traversal pass over `source`, reporting into `sink`.
    ///
    /// `sink.finalize()` is called exactly once, including when the source
    /// fails to parse.
    pub fn analyze<S: ExportSink + ?Sized>(
        &mut self,
        source: &str,
        language: SourceLanguage,
        sink: &mut S,
    ) -> AnalysisResult<()> {
        let parsed = self.parse(source, language);
        if let Ok(tree) = &parsed {
            ExportVisitor::new(&mut *sink, source).visit(tree.root_node());
        }
        sink.finalize();
        parsed.map(|_| ())
    }

    fn parse(&mut self, source: &str, language: SourceLanguage) -> AnalysisResult<Tree> {
        let parser = match language {
            SourceLanguage::JavaScript => &mut self.js_parser,
            SourceLanguage::TypeScript => &mut self.ts_parser,
            SourceLanguage::Tsx => &mut self.tsx_parser,
        };

        let tree = parser
            .parse(source, None)
            .ok_or(AnalysisError::Parse { line: 1, column: 1 })?;

        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root)
                .map(|n| n.start_position())
                .unwrap_or_else(|| root.start_position());
            debug!(row = position.row, column = position.column, "rejecting malformed unit");
            return Err(AnalysisError::Parse {
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        Ok(tree)
    }
}

fn parser_for(language: SourceLanguage) -> AnalysisResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|_| AnalysisError::LanguageInit)?;
    Ok(parser)
}

/// First ERROR or MISSING node in document order. Subtrees without errors
/// are skipped.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Analyze one JavaScript unit and return its exports and re-exports.
pub fn parse_unit(source: &str) -> AnalysisResult<ModuleExports> {
    ExportAnalyzer::new()?.parse_unit(source)
}

/// Exports of a JSON module: the keys of its root object.
pub fn parse_json_module(source: &str) -> AnalysisResult<ModuleExports> {
    let value: serde_json::Value = serde_json::from_str(source)?;
    let exports = match value {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    Ok(ModuleExports {
        exports,
        reexports: Vec::new(),
    })
}
