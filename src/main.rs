use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use fuzzedit::tool::{EditOutput, EditRequest, EditTool, LocalFileStore};
use log::{info, Level, LevelFilter};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

// --- Main Application Entry Point ---

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        // Using {:?} prints the full error chain from `anyhow`.
        eprintln!("{} {:?}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Contains the primary logic of the application.
fn run(args: Args) -> Result<()> {
    setup_logging(args.verbose);

    // --- Argument Validation ---
    if !args.root.is_dir() {
        return Err(anyhow!(
            "Repository root '{}' not found or is not a directory.",
            args.root.display()
        ));
    }
    let root = fs::canonicalize(&args.root)
        .with_context(|| format!("Failed to resolve repository root '{}'", args.root.display()))?;

    let old_string = read_text(args.old, args.old_file)?.unwrap_or_default();
    let new_string = read_text(args.new, args.new_file)?
        .ok_or_else(|| anyhow!("Either --new or --new-file must be given."))?;

    // --- Core Editing Logic ---
    let tool = EditTool::new(LocalFileStore, &root).dry_run(args.dry_run);
    let request = EditRequest::new(&args.file_path, old_string, new_string)
        .replace_all(args.replace_all);

    let output = tool
        .edit(&request)
        .with_context(|| format!("Failed to edit '{}'", args.file_path))?;

    print_output(&output);

    let filediff = &output.metadata.filediff;
    info!(
        "{} line(s) added, {} line(s) removed.",
        filediff.additions, filediff.deletions
    );
    if args.dry_run {
        info!("DRY RUN completed. No files were modified.");
    }

    Ok(())
}

// --- Helper Structs and Functions ---

/// Takes text given inline, or reads it from a file.
fn read_text(inline: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("Failed to read '{}'", path.display())),
        (None, None) => Ok(None),
    }
}

/// Prints the transcript line and a colorized diff.
fn print_output(output: &EditOutput) {
    println!("{}", format!("File edited: {}", output.title).bold());
    if output.metadata.diff.is_empty() {
        return;
    }
    println!();
    for line in output.metadata.diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{}", line);
        }
    }
}

/// Defines the command-line arguments for the application.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replace text in a file, tolerating whitespace, indentation and escaping differences.",
    long_about = "Locates the intended occurrence of --old even when it does not match the file byte-for-byte, and refuses to edit when more than one location fits. Omitting --old replaces the whole file with --new."
)]
struct Args {
    /// The file to edit, absolute or relative to the repository root.
    file_path: String,
    /// The repository root. Edits outside it are refused.
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,
    /// The text to replace.
    #[arg(long, conflicts_with = "old_file")]
    old: Option<String>,
    /// Read the text to replace from a file.
    #[arg(long)]
    old_file: Option<PathBuf>,
    /// The replacement text.
    #[arg(long, conflicts_with = "new_file", required_unless_present = "new_file")]
    new: Option<String>,
    /// Read the replacement text from a file.
    #[arg(long)]
    new_file: Option<PathBuf>,
    /// Replace every occurrence instead of requiring a unique match.
    #[arg(short = 'a', long)]
    replace_all: bool,
    /// Show what would be done, but don't modify files.
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Increase logging verbosity. Can be used multiple times.
    #[arg(short, long, action = clap::ArgAction::Count, long_help = "Increase logging verbosity.\n-v for info, -vv for debug, -vvv for trace.")]
    verbose: u8,
}

/// Sets up the global logger for the requested verbosity.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace, // -vvv and higher
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();
}
