use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use context_doc_chunker::{
    extract_contextual_info, sanitize_bytes, DocumentProcessor, RawDocument, WhitespaceMode,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::OptionOverrides;

mod config;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "context-chunk")]
#[command(about = "Context-preserving chunking of documentation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a document into enriched chunks (JSON array on stdout)
    Chunk(ChunkArgs),

    /// Print the sanitized text of a document
    Sanitize(SanitizeArgs),

    /// Print titles, steps and code blocks found in a document (JSON)
    Context(ContextArgs),
}

#[derive(Args)]
struct ChunkArgs {
    /// Input file (stdin when absent or `-`)
    file: Option<PathBuf>,

    /// Parse the input as a JSON document `{"text": ..., "metadata": {...}}`
    #[arg(long)]
    document: bool,

    /// Extra metadata as a JSON object, merged over the document's own
    #[arg(long)]
    metadata: Option<String>,

    /// Target chunk size in chars
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap between consecutive chunks in chars
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Allow cuts inside fenced code blocks
    #[arg(long)]
    no_code_blocks: bool,

    /// Skip whole-section grouping
    #[arg(long)]
    no_sections: bool,

    /// Keep line structure instead of collapsing all whitespace
    #[arg(long)]
    preserve_lines: bool,

    /// Print chunking statistics to stderr
    #[arg(long)]
    stats: bool,

    /// TOML config file (overrides CONTEXT_CHUNKER_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct SanitizeArgs {
    /// Input file (stdin when absent or `-`)
    file: Option<PathBuf>,

    /// Keep line structure instead of collapsing all whitespace
    #[arg(long)]
    preserve_lines: bool,
}

#[derive(Args)]
struct ContextArgs {
    /// Input file (stdin when absent or `-`)
    file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Chunk(args) => run_chunk(args)?,
        Commands::Sanitize(args) => run_sanitize(args)?,
        Commands::Context(args) => run_context(args)?,
    }

    Ok(())
}

/// Chunk a document
fn run_chunk(args: ChunkArgs) -> Result<()> {
    let overrides = OptionOverrides {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
        no_code_blocks: args.no_code_blocks,
        no_sections: args.no_sections,
        preserve_lines: args.preserve_lines,
    };
    let options = config::resolve_options(args.config.as_deref(), &overrides)?;
    let processor = DocumentProcessor::new(options)?;

    let input = read_input(args.file.as_deref())?;
    let mut document = if args.document {
        let value: Value =
            serde_json::from_slice(&input).context("Failed to parse input as a JSON document")?;
        RawDocument::from_value(value)
    } else {
        RawDocument::new(String::from_utf8_lossy(&input))
    };

    if let Some(raw) = &args.metadata {
        document.metadata.extend(parse_metadata(raw)?);
    }

    let chunks = processor.process_document(&document)?;
    if args.stats {
        eprintln!("{}", DocumentProcessor::stats(&chunks));
    }

    print_stdout(&to_json(&chunks, args.pretty)?)
}

/// Print sanitized text
fn run_sanitize(args: SanitizeArgs) -> Result<()> {
    let mode = if args.preserve_lines {
        WhitespaceMode::PreserveLines
    } else {
        WhitespaceMode::Collapse
    };

    let input = read_input(args.file.as_deref())?;
    print_stdout(&sanitize_bytes(&input, mode))
}

/// Print contextual landmarks
fn run_context(args: ContextArgs) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let text = sanitize_bytes(&input, WhitespaceMode::PreserveLines);
    let info = extract_contextual_info(&text);
    log::debug!(
        "Found {} titles, {} steps, {} code blocks",
        info.titles.len(),
        info.steps.len(),
        info.code_blocks.len()
    );

    print_stdout(&to_json(&info, args.pretty)?)
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read(path).with_context(|| format!("Failed to read input from {}", path.display()))
        }
        _ => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read input from stdin")?;
            Ok(buffer)
        }
    }
}

fn parse_metadata(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Failed to parse --metadata")? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--metadata must be a JSON object"),
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
