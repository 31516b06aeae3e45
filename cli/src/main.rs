mod config;
mod discover;
mod summary;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use exemplar::Atom;
use verifier::{CancelToken, CorpusEntry, Report, RunOptions, run_corpus};

#[derive(Parser)]
#[command(name = "exemplar", version, about = "Literate-example verifier")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify every extracted listing under a path
    Verify(VerifyArgs),

    /// List extracted listings without running them
    List(ListArgs),
}

#[derive(clap::Args)]
struct VerifyArgs {
    /// Markdown file or directory to verify
    path: PathBuf,

    /// Worker threads (default: one per CPU core)
    #[arg(long)]
    workers: Option<usize>,

    /// Per-listing wall-clock limit in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Stop scheduling new units after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Write a machine-readable JSON report to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// TOML config file (default: exemplar.toml beside the corpus)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Markdown file or directory to scan
    path: PathBuf,
}

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Verify(args) => do_verify(args, cli.no_color),
        Command::List(args) => do_list(args),
    };
    process::exit(code);
}

fn do_verify(args: VerifyArgs, no_color: bool) -> i32 {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let file_config = match config::load(args.config.as_deref(), &args.path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return 2;
        }
    };

    let paths = discover::discover_atoms(&args.path);
    if paths.is_empty() {
        eprintln!("no markdown documents found under {}", args.path.display());
        return 2;
    }

    let entries = parse_corpus(paths, color_choice);

    let options = RunOptions {
        workers: args.workers.or(file_config.workers).unwrap_or(0),
        timeout: Duration::from_millis(
            args.timeout_ms
                .or(file_config.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        ),
        fail_fast: args.fail_fast,
    };
    let toolchain = file_config.toolchain();

    let report = match run_corpus(&entries, &toolchain, &options, &CancelToken::new()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {}", e);
            return 2;
        }
    };

    summary::print_summary(&report, no_color);

    if let Some(json_path) = &args.json {
        if let Err(e) = write_json(json_path, &report) {
            eprintln!(
                "error: cannot write JSON report to '{}': {}",
                json_path.display(),
                e
            );
            return 2;
        }
    }

    report.exit_code()
}

/// Parse every discovered atom. Structural errors are emitted to stderr as
/// they are found and carried into the report; the run continues with the
/// remaining atoms.
fn parse_corpus(paths: Vec<PathBuf>, color_choice: ColorChoice) -> Vec<CorpusEntry> {
    let mut files = SimpleFiles::new();
    let mut entries = Vec::new();

    for path in paths {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                entries.push(CorpusEntry {
                    atom: Atom {
                        path,
                        blocks: Vec::new(),
                        source_id: 0,
                    },
                    structural_errors: vec![format!("cannot read file: {}", e)],
                });
                continue;
            }
        };

        let file_id = files.add(path.display().to_string(), source.clone());
        let parser = exemplar::parser::Parser::new(source, file_id);
        let (atom, errors) = parser.parse(path);

        if !errors.is_empty() {
            let writer = StandardStream::stderr(color_choice);
            let term_config = term::Config::default();
            for error in &errors {
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &term_config,
                    &files,
                    &error.to_diagnostic(),
                );
            }
        }

        entries.push(CorpusEntry {
            atom,
            structural_errors: errors.iter().map(|e| e.message.clone()).collect(),
        });
    }

    entries
}

fn do_list(args: ListArgs) -> i32 {
    let paths = discover::discover_atoms(&args.path);
    if paths.is_empty() {
        eprintln!("no markdown documents found under {}", args.path.display());
        return 2;
    }

    let mut structural = 0usize;
    for path in paths {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: cannot read file: {}", path.display(), e);
                structural += 1;
                continue;
            }
        };

        let parser = exemplar::parser::Parser::new(source, 0);
        let (atom, errors) = parser.parse(path);

        println!("{}", atom.path.display());
        for error in &errors {
            println!("  ! {}", error.message);
            structural += 1;
        }
        for block in &atom.blocks {
            let label = block.label.as_deref().unwrap_or("(unlabeled)");
            let mut notes = Vec::new();
            if let Some(pkg) = &block.package {
                notes.push(format!("package {}", pkg));
            }
            if let Some(expected) = &block.expected {
                notes.push(match expected.mode {
                    exemplar::block::OutputMode::Exact => "expects output".to_string(),
                    exemplar::block::OutputMode::Sample => "sample output".to_string(),
                });
            }
            if !block.runnable {
                notes.push("not runnable".to_string());
            }
            if notes.is_empty() {
                println!("  {:>3}. {}", block.index + 1, label);
            } else {
                println!("  {:>3}. {} [{}]", block.index + 1, label, notes.join(", "));
            }
        }
    }

    if structural > 0 { 2 } else { 0 }
}

fn write_json(path: &Path, report: &Report) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
    serde_json::to_writer_pretty(file, report).map_err(|e| e.to_string())
}
