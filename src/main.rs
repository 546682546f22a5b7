use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use linepatch::{
    load_from_path, AuditLog, EditError, EditorConfig, LineEditor, SearchEngine, SearchReport,
    SubstitutionReport,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "LINEPATCH_CONFIG";
const CONFIG_FILE_NAME: &str = ".linepatch.toml";

#[derive(Parser)]
#[command(name = "linepatch")]
#[command(about = "Line-oriented text file editor with an audit log", long_about = None)]
#[command(version)]
struct Cli {
    /// Editor config file (defaults to $LINEPATCH_CONFIG, then ~/.linepatch.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a line to the end of a file
    Append { file: PathBuf, text: String },

    /// Insert a line before LINENO (LINENO may be one past the last line)
    Insert {
        file: PathBuf,
        text: String,
        lineno: usize,
    },

    /// Delete a line
    Delete { file: PathBuf, lineno: usize },

    /// Replace the content of a line
    Replace {
        file: PathBuf,
        text: String,
        lineno: usize,
    },

    /// Replace every occurrence of KEY with SUB
    Substitute {
        file: PathBuf,
        key: String,
        sub: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count occurrences of a literal string
    Search {
        file: PathBuf,
        key: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List lines matching a case-insensitive regular expression
    Grep {
        file: PathBuf,
        pattern: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the audit log, optionally only entries for one file
    Log { file: Option<String> },

    /// Count the lines of a file
    Count { file: PathBuf },

    /// Print a single line
    ShowLine { file: PathBuf, lineno: usize },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config)?;

    match cli.command {
        Commands::Append { file, text } => {
            let outcome = LineEditor::new(&config).append(&file, &text)?;
            print_done(&file, "line appended", outcome.lines_after);
        }
        Commands::Insert { file, text, lineno } => {
            let outcome = LineEditor::new(&config).insert_at(&file, lineno, &text)?;
            print_done(
                &file,
                &format!("line inserted at {lineno}"),
                outcome.lines_after,
            );
        }
        Commands::Delete { file, lineno } => {
            let outcome = LineEditor::new(&config).delete_at(&file, lineno)?;
            print_done(&file, &format!("line {lineno} deleted"), outcome.lines_after);
        }
        Commands::Replace { file, text, lineno } => {
            let outcome = LineEditor::new(&config).replace_at(&file, lineno, &text)?;
            print_done(&file, &format!("line {lineno} replaced"), outcome.lines_after);
        }
        Commands::Substitute {
            file,
            key,
            sub,
            json,
        } => {
            let report = LineEditor::new(&config).replace_substring(&file, &key, &sub)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_substitutions(&report);
            }
        }
        Commands::Search { file, key, json } => {
            let report = SearchEngine::new(&config).search_literal(&file, &key)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_literal_matches(&report);
            }
        }
        Commands::Grep {
            file,
            pattern,
            json,
        } => {
            let report = SearchEngine::new(&config).search_pattern(&file, &pattern)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_pattern_matches(&report);
            }
        }
        Commands::Log { file } => {
            let audit = AuditLog::new(&config);
            let shown = audit.display(file.as_deref(), &mut io::stdout().lock())?;
            if shown == 0 {
                println!("{}", "No matching log entries".yellow());
            }
        }
        Commands::Count { file } => {
            let lines = LineEditor::new(&config).count_lines(&file)?;
            println!("Number of lines in the file: {lines}");
        }
        Commands::ShowLine { file, lineno } => {
            let line = LineEditor::new(&config).show_line(&file, lineno)?;
            println!("{}", String::from_utf8_lossy(&line));
        }
    }

    Ok(())
}

/// Resolve the editor config.
///
/// Priority order:
/// 1. Explicit --config flag
/// 2. LINEPATCH_CONFIG environment variable
/// 3. ~/.linepatch.toml, if it exists
/// 4. Built-in defaults
fn resolve_config(cli_config: Option<PathBuf>) -> Result<EditorConfig> {
    if let Some(path) = cli_config {
        return Ok(load_from_path(&path)?);
    }

    if let Ok(env_path) = env::var(CONFIG_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(load_from_path(&path)?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: {} is set but path doesn't exist: {}",
                CONFIG_ENV, env_path
            )
            .yellow()
        );
    }

    if let Some(path) = home::home_dir().map(|home| home.join(CONFIG_FILE_NAME)) {
        if path.is_file() {
            return load_from_path(&path)
                .with_context(|| format!("while loading {}", path.display()));
        }
    }

    Ok(EditorConfig::default())
}

fn print_done(file: &Path, what: &str, lines_after: usize) {
    println!(
        "{} {}: {} ({} lines)",
        "✓".green(),
        file.display(),
        what,
        lines_after
    );
}

fn print_literal_matches(report: &SearchReport) {
    let width = report.line_number_width();
    for m in &report.matches {
        println!("{} instance/s:", m.occurrences);
        println!("{:0width$} |{}", m.lineno, m.text, width = width);
        println!();
    }
    println!("{} instance/s found in the file.", report.total);
}

fn print_pattern_matches(report: &SearchReport) {
    let width = report.line_number_width();
    for m in &report.matches {
        println!("{:0width$} |{}", m.lineno, m.text, width = width);
    }
    println!("{} line matches found in the file.", report.total);
}

/// Print each rewritten line before and after, highlighting what changed.
fn print_substitutions(report: &SubstitutionReport) {
    let width = linepatch::scan::line_number_width(report.lines_after);
    for line in &report.lines {
        println!("{} substitution/s:", line.occurrences);

        let diff = TextDiff::from_chars(line.before.as_str(), line.after.as_str());
        let mut before = String::new();
        let mut after = String::new();
        for change in diff.iter_all_changes() {
            let text = change.value();
            match change.tag() {
                ChangeTag::Delete => before.push_str(&text.red().to_string()),
                ChangeTag::Insert => after.push_str(&text.green().to_string()),
                ChangeTag::Equal => {
                    before.push_str(text);
                    after.push_str(text);
                }
            }
        }

        println!("{:0width$} |{}", line.lineno, before, width = width);
        println!("{:0width$} |{}", line.lineno, after, width = width);
        println!();
    }
    println!("{} instances replaced in the file.", report.total);
}

fn report_error(err: &anyhow::Error) {
    if let Some(scratch) = err
        .downcast_ref::<EditError>()
        .and_then(EditError::leftover_scratch)
    {
        eprintln!("{} {}", "✗ Manual intervention required:".red().bold(), err);
        eprintln!("  The new content was left in {}", scratch.display());
        return;
    }

    eprintln!("{} {:#}", "✗".red(), err);
}
