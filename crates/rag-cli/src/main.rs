//! rag CLI: prepare and query a hosted file search store

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rag_core::ledger::{self, Ledger};
use rag_core::prepare::ProgressEvent;
use rag_core::{Config, DEFAULT_CONFIG_FILE, GeminiClient, Preparer, ask, delete, status, store};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

#[derive(Parser)]
#[command(name = "rag")]
#[command(about = "Sync a docs folder into a file search store and ask questions about it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .rag.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file (default: .file_index.json)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Show progress logs
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct StoreArgs {
    /// Display name of the file search store
    #[arg(long)]
    store_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and import files in the docs folder to a file search store
    Prepare {
        /// Path to folder with files to upload
        #[arg(long)]
        docs: Option<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,

        /// Try UTF-8 filenames/display names first (fall back to ASCII-safe if rejected)
        #[arg(long)]
        utf8_names: bool,

        /// Only remove invalid file ids from the ledger and exit
        #[arg(long)]
        clean_state_only: bool,
    },

    /// Ask a question and consult the file search store
    Ask {
        /// Prompt to send to the model
        query: Vec<String>,

        #[command(flatten)]
        store: StoreArgs,

        /// Model to use for generation
        #[arg(long)]
        model: Option<String>,
    },

    /// Delete a file search store and optionally the local ledger
    DeleteStore {
        #[command(flatten)]
        store: StoreArgs,

        /// Confirm deletion without prompting
        #[arg(long)]
        yes: bool,

        /// Also remove the local ledger file
        #[arg(long)]
        delete_state: bool,

        /// Delete all documents in the store before deleting the store itself
        #[arg(long)]
        force: bool,
    },

    /// Show configuration and ledger status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }

    match cli.command {
        Commands::Prepare {
            docs,
            store,
            utf8_names,
            clean_state_only,
        } => {
            if let Some(docs) = docs {
                config.docs_dir = docs;
            }
            apply_store_name(&mut config, store);
            config.prefer_original_name |= utf8_names;
            if clean_state_only {
                cmd_clean_state(&config)?;
            } else {
                cmd_prepare(&config)?;
            }
        }
        Commands::Ask {
            query,
            store,
            model,
        } => {
            apply_store_name(&mut config, store);
            if let Some(model) = model {
                config.model = model;
            }
            cmd_ask(&config, &query.join(" "))?;
        }
        Commands::DeleteStore {
            store,
            yes,
            delete_state,
            force,
        } => {
            apply_store_name(&mut config, store);
            cmd_delete_store(&config, yes, delete_state, force)?;
        }
        Commands::Status => cmd_status(&config)?,
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    Config::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn apply_store_name(config: &mut Config, store: StoreArgs) {
    if let Some(name) = store.store_name {
        config.store_name = name;
    }
}

fn client(config: &Config) -> Result<GeminiClient> {
    GeminiClient::from_config(config).with_context(|| {
        format!(
            "Failed to create API client. Set {} (or GEMINI_API_KEY).",
            config.api_key_env
        )
    })
}

fn cmd_clean_state(config: &Config) -> Result<()> {
    let mut ledger = Ledger::load_or_default(&config.state_file);
    let removed = ledger.prune()?;
    for key in &removed {
        println!("Removed invalid state entry: {}", key);
    }
    println!("State cleanup finished ({} removed).", removed.len());
    Ok(())
}

fn cmd_prepare(config: &Config) -> Result<()> {
    if !config.docs_dir.is_dir() {
        anyhow::bail!("Docs dir not found: {}", config.docs_dir.display());
    }
    let client = client(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid progress template")?,
    );
    pb.set_message("Preparing file search store...");

    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .context("invalid progress template")?
        .progress_chars("█▓░");

    let mut preparer = Preparer::new(&client, config);
    preparer.set_progress_callback(Box::new({
        let pb = pb.clone();
        move |event| match event {
            ProgressEvent::Found { total } => {
                pb.set_style(bar_style.clone());
                pb.set_length(total as u64);
            }
            ProgressEvent::Uploading { current, path, .. } => {
                pb.set_position(current.saturating_sub(1) as u64);
                pb.set_message(format!("uploading {}", display_name(path)));
            }
            ProgressEvent::Importing { current, path, .. } => {
                pb.set_position(current as u64);
                pb.set_message(format!("importing {}", display_name(path)));
            }
        }
    }));

    let outcome = preparer.prepare()?;
    pb.finish_and_clear();

    let stats = outcome.stats;
    println!("✓ Prepare complete:");
    println!("  Files found:     {}", stats.files_found);
    println!("  Files uploaded:  {}", stats.files_uploaded);
    println!("  Already known:   {}", stats.files_reused);
    println!("  Files imported:  {}", stats.files_imported);
    println!("  Files skipped:   {}", stats.files_skipped);
    println!("  Files failed:    {}", stats.files_failed);
    if stats.entries_pruned > 0 {
        println!("  Stale ids removed: {}", stats.entries_pruned);
    }
    println!(
        "Store created / used: {} (display: {})",
        outcome.store.name, outcome.store.display_name
    );

    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_ask(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Empty query. Usage: rag ask \"your question\"");
    }
    let client = client(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid progress template")?,
    );
    pb.set_message("Sending prompt to LLM with file search...");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let answer = ask::ask(&client, &config.store_name, query, &config.model);
    pb.finish_and_clear();
    let answer = answer.with_context(|| {
        format!(
            "Could not answer from store '{}'. Create/import it first using `rag prepare`.",
            config.store_name
        )
    })?;

    println!("--- LLM Response ---");
    if std::io::stdout().is_terminal() {
        println!("{}", MarkdownHighlighter::new().highlight(&answer));
    } else {
        println!("{}", answer);
    }

    Ok(())
}

fn cmd_delete_store(config: &Config, yes: bool, delete_state: bool, force: bool) -> Result<()> {
    let client = client(config)?;

    match store::find_store(&client, &config.store_name)? {
        None => println!("Store not found: {}", config.store_name),
        Some(found) => {
            if !yes && !confirm(&format!(
                "Delete store {} (id: {})? This is irreversible. (y/N): ",
                found.display_name, found.name
            ))? {
                println!("Aborting store delete");
                return Ok(());
            }
            match delete::delete_store(&client, &found, force) {
                Ok(report) => {
                    if force {
                        println!("Deleted {} documents from store", report.documents_deleted);
                        if report.documents_failed > 0 {
                            println!("  {} documents could not be deleted", report.documents_failed);
                        }
                    }
                    println!("Deleted store {} (id: {})", found.display_name, found.name);
                }
                Err(e) => {
                    eprintln!("Failed to delete store: {}", e);
                    if !force {
                        eprintln!("Hint: a store that still holds documents may need --force.");
                    }
                }
            }
        }
    }

    if delete_state {
        match ledger::delete_ledger_file(&config.state_file) {
            Ok(true) => println!("Deleted local state {}", config.state_file.display()),
            Ok(false) => println!("Local state file not present"),
            Err(e) => eprintln!("Failed to delete local state: {}", e),
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

fn cmd_status(config: &Config) -> Result<()> {
    let ledger = Ledger::load(&config.state_file)
        .with_context(|| format!("Failed to read ledger {}", config.state_file.display()))?;
    let report = status::ledger_status(&ledger);

    println!("Configuration:");
    println!("  Docs dir:    {}", config.docs_dir.display());
    println!("  Store name:  {}", config.store_name);
    println!("  Model:       {}", config.model);
    println!("  UTF-8 names: {}", config.prefer_original_name);
    println!();
    println!("Ledger: {}", ledger.path().display());
    println!("  Entries:     {}", report.entries);
    println!("  Invalid ids: {}", report.invalid);
    println!("  Unchanged:   {}", report.unchanged);
    println!("  Not hashed:  {}", report.unknown);
    println!("  Changed:     {}", report.changed.len());
    for path in &report.changed {
        println!("    {}", path);
    }
    println!("  Missing:     {}", report.missing.len());
    for path in &report.missing {
        println!("    {}", path);
    }
    if report.invalid > 0 {
        println!();
        println!("Run `rag prepare --clean-state-only` to remove invalid ids.");
    }

    Ok(())
}

/// Wrapper around syntect for rendering Markdown answers.
struct MarkdownHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl MarkdownHighlighter {
    fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    fn highlight(&self, text: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension("md")
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let Some(theme) = self.theme_set.themes.get("base16-ocean.dark") else {
            return text.to_string();
        };
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in LinesWithEndings::from(text) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
                }
                Err(_) => {
                    output.push_str(line);
                }
            }
        }
        output.push_str("\x1b[0m"); // Reset colors

        output
    }
}
