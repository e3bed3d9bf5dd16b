use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use exportscope::analysis::{ExportAnalyzer, SourceLanguage};
use exportscope::report::{self, FileOutcome, FileReport, ReportFormat};
use exportscope::resolve::{ExportResolver, NodeHost, ResolveOptions};

#[derive(Parser)]
#[command(name = "exportscope")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version)]
#[command(about = "Static export-surface analyzer for CommonJS and UMD modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Exports and re-exports of a single file, without following re-exports
    Unit {
        /// File to analyze
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Complete export surface of a file, following re-exports across files
    Entry {
        /// Entry file to analyze
        file: PathBuf,

        #[command(flatten)]
        resolve: ResolveArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Resolve every JavaScript/TypeScript file under a directory
    Scan {
        /// Directory to scan (defaults to current directory)
        #[arg(default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        resolve: ResolveArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show version information
    Version,
}

#[derive(Args)]
struct OutputArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: ReportFormat,
}

#[derive(Args)]
struct ResolveArgs {
    /// Extension tried when resolving a specifier (repeatable, replaces the defaults)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// package.json field naming a package's entry point (repeatable)
    #[arg(long = "main-field", value_name = "FIELD")]
    main_fields: Vec<String>,
}

impl ResolveArgs {
    fn options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::default();
        if !self.extensions.is_empty() {
            options = options.with_extensions(&self.extensions);
        }
        if !self.main_fields.is_empty() {
            options = options.with_main_fields(self.main_fields.iter().cloned());
        }
        options
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Unit { file, output }) => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut analyzer = ExportAnalyzer::new()?;
            let unit = analyzer
                .parse_unit_as(&source, SourceLanguage::from_path(&file))
                .with_context(|| format!("Failed to analyze {}", file.display()))?;
            print_reports(output.format, &[FileReport::new(&file, FileOutcome::Unit(unit))])
        }
        Some(Commands::Entry {
            file,
            resolve,
            output,
        }) => {
            let entry = absolute(&file)?;
            let mut resolver = ExportResolver::with_host(NodeHost::new(resolve.options()))?;
            let exports = resolver
                .parse_entry_file(&entry)
                .with_context(|| format!("Failed to resolve exports of {}", entry.display()))?;
            print_reports(output.format, &[FileReport::new(&file, FileOutcome::Entry(exports))])
        }
        Some(Commands::Scan {
            dir,
            resolve,
            output,
        }) => {
            let root = absolute(&dir)?;
            let mut resolver = ExportResolver::with_host(NodeHost::new(resolve.options()))?;
            let reports: Vec<FileReport> = source_files(&root)
                .into_iter()
                .map(|path| {
                    let outcome = match resolver.parse_entry_file(&path) {
                        Ok(exports) => FileOutcome::Entry(exports),
                        Err(e) => {
                            warn!("Failed to analyze {}: {}", path.display(), e);
                            FileOutcome::Failed(e.to_string())
                        }
                    };
                    let shown = path.strip_prefix(&root).unwrap_or(&path);
                    FileReport::new(shown, outcome)
                })
                .collect();
            print_reports(output.format, &reports)
        }
        Some(Commands::Version) => {
            println!("exportscope v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            println!("ExportScope - CommonJS/UMD export analyzer");
            println!("Run 'exportscope entry <FILE>' to list a module's exports");
            println!("Run 'exportscope --help' for more information");
            Ok(())
        }
    }
}

fn print_reports(format: ReportFormat, reports: &[FileReport]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    report::report(format, reports, &mut handle).context("Failed to write report")
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

/// JavaScript/TypeScript files under `root`, skipping dependency and build
/// output directories.
fn source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SourceLanguage::from_extension)
                .is_some()
        })
        .map(|e| e.into_path())
        .collect()
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "node_modules" | ".git" | "dist" | "build" | ".next" | "coverage" | ".turbo"
    )
}
