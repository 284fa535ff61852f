//! # Worklog Digest CLI (`worklog`)
//!
//! Reads a day's team work logs, asks a local Ollama model for a
//! consolidated summary and thank-you notes, and optionally saves both as
//! DOCX files.
//!
//! ## Usage
//!
//! ```bash
//! worklog --config ./config/worklog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `worklog run [FILES..]` | Run the full pipeline on files or a folder |
//! | `worklog select` | Show which files a run would pick up |
//! | `worklog extract <FILE>` | Print the text extracted from one document |
//! | `worklog models` | List models installed on the Ollama server |
//! | `worklog serve-check` | Check (and optionally start) the Ollama server |
//! | `worklog prompts` | Print the effective prompt templates |
//!
//! ## Examples
//!
//! ```bash
//! # Today's logs from a folder, streamed to the terminal and saved
//! worklog run --dir ./logs --save
//!
//! # A past day, written to a specific folder
//! worklog run --dir ./logs --date 251125 --out ./reports
//!
//! # Explicit files, machine-readable progress
//! worklog run alice.docx bob.pdf --progress json
//! ```

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use worklog_digest::config::{self, Config};
use worklog_digest::extract::extract_document;
use worklog_digest::error::WorkflowError;
use worklog_digest::models::{Extraction, OutputKind, PipelineState};
use worklog_digest::ollama::{LanguageModel, OllamaClient, OllamaSettings, ServerManager};
use worklog_digest::output::OutputGenerator;
use worklog_digest::progress::{PipelineEvent, ProgressMode};
use worklog_digest::prompts::PromptSet;
use worklog_digest::{logging, selector, worker};

/// Worklog Digest: summaries and thank-you notes from daily work logs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/worklog.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "worklog",
    about = "Summarize a day's team work logs with a local Ollama model",
    version,
    long_about = "Worklog Digest extracts text from PDF and Word work logs, asks a local \
    Ollama model for a consolidated meeting summary and personalized thank-you notes, \
    and saves both as date-stamped DOCX files."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/worklog.toml`. A missing file means built-in
    /// defaults.
    #[arg(long, global = true, default_value = "./config/worklog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: extract, summarize, write thank-you notes.
    ///
    /// Files are taken from the arguments, or selected from `--dir` (or
    /// `selection.directory`) by today's `YYMMDD` stamp. Generated text
    /// streams to stdout; status goes to stderr. Ctrl-C cancels after the
    /// current step; a second Ctrl-C quits at once.
    Run {
        /// Explicit work-log files. Overrides folder selection.
        files: Vec<PathBuf>,

        /// Folder to select work logs from.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Date stamp (YYMMDD) to select by and to name outputs with.
        #[arg(long, value_parser = parse_stamp)]
        date: Option<NaiveDate>,

        /// Take every supported file in the folder, ignoring the date stamp.
        #[arg(long)]
        all: bool,

        /// Save both documents to the configured output directory.
        #[arg(long)]
        save: bool,

        /// Save both documents to this directory (implies `--save`).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Model to use instead of `ollama.model`.
        #[arg(long)]
        model: Option<String>,

        /// Progress output: `human`, `json`, or `off`.
        /// Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// List the files a run would process.
    Select {
        /// Folder to select work logs from.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Date stamp (YYMMDD); defaults to today.
        #[arg(long, value_parser = parse_stamp)]
        date: Option<NaiveDate>,

        /// List every supported file, ignoring the date stamp.
        #[arg(long)]
        all: bool,
    },

    /// Extract and print the text of a single document.
    Extract {
        /// A `.pdf`, `.docx` or `.doc` file.
        file: PathBuf,
    },

    /// List models installed on the Ollama server.
    Models,

    /// Check that the Ollama server answers.
    ServeCheck {
        /// Start `ollama serve` when the server is not running.
        #[arg(long)]
        start: bool,
    },

    /// Print the effective prompt templates.
    Prompts,
}

fn parse_stamp(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%y%m%d")
        .map_err(|_| format!("expected a YYMMDD date stamp, got '{}'", s))
}

fn parse_progress(s: &str) -> std::result::Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("expected human, json or off, got '{}'", s))
}

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    // JSON progress owns stderr, and human progress already shows pipeline
    // failures.
    let console_logs = match &cli.command {
        Commands::Run { progress, .. } => {
            progress.unwrap_or_else(ProgressMode::default_for_tty) == ProgressMode::Human
        }
        _ => true,
    };
    logging::init(&cfg.logging, console_logs)?;
    logging::capture_worker_panics();

    match cli.command {
        Commands::Run {
            files,
            dir,
            date,
            all,
            save,
            out,
            model,
            progress,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let files = if files.is_empty() {
                select_files(&cfg, dir, date, all)?
            } else {
                selector::validate_files(&files)
            };
            if files.is_empty() {
                println!("No work-log files selected.");
                return Ok(ExitCode::SUCCESS);
            }
            let out = match (save, out) {
                (_, Some(dir)) => Some(dir),
                (true, None) => Some(cfg.output.directory.clone()),
                (false, None) => None,
            };
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            return run_pipeline(&cfg, files, date, model, progress, out);
        }
        Commands::Select { dir, date, all } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let files = select_files(&cfg, dir, date, all)?;
            for file in &files {
                println!("{}", file.display());
            }
            eprintln!("{} file(s) selected", files.len());
        }
        Commands::Extract { file } => {
            let document = extract_document(&file);
            match document.extraction {
                Extraction::Text(text) => println!("{}", text),
                Extraction::Failed(reason) => {
                    bail!("Failed to extract {}: {}", file.display(), reason)
                }
            }
        }
        Commands::Models => {
            let client = build_client(&cfg, None)?;
            let models = client
                .list_models()
                .with_context(|| format!("Failed to list models at {}", client.base_url()))?;
            println!("Ollama at {}: {} model(s)", client.base_url(), models.len());
            for name in &models {
                let marker = if name == client.model_name() { "*" } else { " " };
                println!("{} {}", marker, name);
            }
            if !models.iter().any(|m| m == client.model_name()) {
                eprintln!(
                    "warning: configured model '{}' is not installed (try `ollama pull {}`)",
                    client.model_name(),
                    client.model_name()
                );
            }
        }
        Commands::ServeCheck { start } => {
            let client = build_client(&cfg, None)?;
            if start {
                let wait = Duration::from_secs(cfg.ollama.start_wait_secs);
                if !ServerManager::new(&client).ensure_running(wait)? {
                    bail!(
                        "Ollama server at {} did not answer within {}s",
                        client.base_url(),
                        wait.as_secs()
                    );
                }
            } else {
                client.check_available()?;
            }
            println!("Ollama is running at {}", client.base_url());
        }
        Commands::Prompts => {
            let prompts = PromptSet::from_config(&cfg.prompts);
            println!("== system ==\n{}\n", prompts.system);
            println!("== summary ==\n{}\n", prompts.summary);
            println!("== thanks ==\n{}", prompts.thanks);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn select_files(
    cfg: &Config,
    dir: Option<PathBuf>,
    date: NaiveDate,
    all: bool,
) -> Result<Vec<PathBuf>> {
    let dir = match dir.or_else(|| cfg.selection.directory.clone()) {
        Some(d) => d,
        None => bail!("No input folder: pass files, --dir, or set selection.directory"),
    };
    let by_date = cfg.selection.auto_detect_today && !all;
    selector::select(&dir, by_date, &selector::date_stamp(date))
}

fn build_client(cfg: &Config, model: Option<String>) -> Result<OllamaClient> {
    let prompts = PromptSet::from_config(&cfg.prompts);
    let mut settings = OllamaSettings::from_config(&cfg.ollama, &prompts.system);
    if let Some(model) = model {
        settings.model = model;
    }
    OllamaClient::new(settings)
}

fn run_pipeline(
    cfg: &Config,
    files: Vec<PathBuf>,
    date: NaiveDate,
    model: Option<String>,
    progress: ProgressMode,
    out: Option<PathBuf>,
) -> Result<ExitCode> {
    let client = build_client(cfg, model)?;
    if cfg.ollama.auto_start {
        let wait = Duration::from_secs(cfg.ollama.start_wait_secs);
        ServerManager::new(&client).ensure_running(wait)?;
    }

    let reporter = progress.reporter();
    let prompts = PromptSet::from_config(&cfg.prompts);
    let mut handle = worker::spawn(client, prompts, files, date)?;
    let cancel = handle.cancel_token();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start event loop")?;

    let (final_state, summary, failure_shown) = runtime.block_on(async {
        let events = handle.events();
        let mut final_state = PipelineState::Idle;
        let mut summary = None;
        let mut failure_shown = false;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        match &event {
                            PipelineEvent::Finished { state } => final_state = *state,
                            PipelineEvent::OutputReady { kind: OutputKind::Summary, text } => {
                                summary = Some(text.clone());
                            }
                            PipelineEvent::Failed { .. } => {
                                failure_shown = progress != ProgressMode::Off;
                            }
                            _ => {}
                        }
                        reporter.report(&event);
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    if cancel.is_cancelled() {
                        tracing::warn!("second interrupt, exiting");
                        if progress == ProgressMode::Human {
                            eprintln!("\nAborted.");
                        }
                        std::process::exit(i32::from(EXIT_INTERRUPTED));
                    }
                    if progress == ProgressMode::Human {
                        eprintln!("\nCancelling after the current step... (Ctrl-C again to quit)");
                    }
                    tracing::info!("cancellation requested");
                    cancel.cancel();
                }
            }
        }
        (final_state, summary, failure_shown)
    });

    let outcome = handle.join();
    tracing::info!(state = final_state.as_str(), "run finished");
    let generator = out.map(|dir| OutputGenerator::from_config(&cfg.output).with_directory(dir));

    let error = match outcome {
        Ok(result) => {
            if progress != ProgressMode::Human {
                println!("{}\n", result.summary.trim_end());
                println!("{}", result.thanks.trim_end());
            } else {
                println!();
            }
            if let Some(generator) = &generator {
                for path in generator.save_all(&result)? {
                    println!("Saved {}", path.display());
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
        Err(error) => error,
    };

    // A finished summary outlives a failed thank-you stage.
    if let Some(summary) = &summary {
        if progress != ProgressMode::Human {
            println!("{}", summary.trim_end());
        } else {
            println!();
        }
        if let Some(generator) = &generator {
            let path = generator.save(OutputKind::Summary, summary, date)?;
            println!("Saved {}", path.display());
        }
    }

    match (&error, progress) {
        (WorkflowError::Cancelled, ProgressMode::Off) => eprintln!("{}", error),
        (WorkflowError::Cancelled, _) => {}
        _ if failure_shown => {}
        _ => eprintln!("error: {}", error),
    }
    Ok(match error {
        WorkflowError::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
        _ => ExitCode::FAILURE,
    })
}
