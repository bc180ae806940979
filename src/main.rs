//! # Sherlock CLI (`sherlock`)
//!
//! Forensic research assistant over local Ollama models.
//!
//! ## Usage
//!
//! ```bash
//! sherlock --config ./config/sherlock.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sherlock screen "<question>"` | Print the intent verdict (`ALLOWED` / `BLOCKED`) |
//! | `sherlock chunks <file>` | Show how a case file is chunked |
//! | `sherlock ask --file <f> "<question>"` | One-shot question about a case file |
//! | `sherlock research [--file <f>]` | Interactive document chat |
//! | `sherlock timeline [--input <f>]` | Interactive log timeline reconstruction |
//! | `sherlock serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Check whether a question passes the intent screen
//! sherlock screen "According to the document, how was the victim killed?"
//!
//! # Chat about a case file
//! sherlock research --file ./cases/case_01.txt
//!
//! # Build a timeline from auth logs
//! sherlock timeline --input /var/log/auth.log
//! ```
//!
//! Diagnostics are written to stderr; set `RUST_LOG=sherlock=debug` for detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sherlock::{config, repl, server};

/// Sherlock: chat with fictional or academic case files and reconstruct
/// incident timelines from logs, backed by a local Ollama instance.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sherlock.example.toml` for a full example. When the
/// file does not exist the built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "sherlock",
    about = "Sherlock: forensic document chat and timeline reconstruction",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sherlock.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a question with the intent screen.
    ///
    /// Pure and offline: prints `ALLOWED` or `BLOCKED`.
    Screen {
        /// The question to classify.
        question: String,
    },

    /// Show the chunks a case file is split into.
    ///
    /// Offline: no embedding or model call is made.
    Chunks {
        /// Path to the case file (text or PDF).
        path: PathBuf,
    },

    /// Ask a single question about a case file.
    Ask {
        /// Path to the case file (text or PDF).
        #[arg(long)]
        file: PathBuf,

        /// The question.
        question: String,
    },

    /// Interactive document chat.
    Research {
        /// Case file to load on start.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Interactive timeline reconstruction from logs and artifacts.
    Timeline {
        /// Artifact file to analyze on start.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Start the HTTP API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sherlock=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Needs no config
    if let Commands::Screen { question } = &cli.command {
        repl::run_screen(question);
        return Ok(());
    }

    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Screen { .. } => unreachable!(),
        Commands::Chunks { path } => {
            repl::run_chunks(&cfg, &path)?;
        }
        Commands::Ask { file, question } => {
            repl::run_ask(&cfg, &file, &question).await?;
        }
        Commands::Research { file } => {
            repl::run_research(&cfg, file.as_deref()).await?;
        }
        Commands::Timeline { input } => {
            repl::run_timeline(&cfg, input.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
