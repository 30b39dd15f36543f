//! Game Review - move quality analysis of finished chess games.
//!
//! Replays a game against the configured evaluation backend and prints the
//! resulting report as JSON.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chess_analysis::{
    narrate, split_move_text, AnalysisConfig, AnalysisReport, BackendKind, GameAnalyzer,
    HttpNarrator, Narration, NarrativePayload, OpeningBook, Oracle, Progress, ReviewConfig,
    RulesOracle, ShakmatyRules, SuggestedLine,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const NARRATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "game-review")]
#[command(about = "Classify every move of a chess game by how much it cost")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Evaluation backend, overriding the configuration (remote or local)
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a complete game
    Analyze {
        /// Moves in SAN or UCI, move numbers and results allowed
        #[arg(short, long, required_unless_present = "file", conflicts_with = "file")]
        moves: Option<String>,
        /// Read the moves from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Start from this position instead of the standard one
        #[arg(long)]
        fen: Option<String>,
        /// Tier opening book moves as book
        #[arg(long)]
        book: bool,
        /// JSON opening book to use instead of the built-in one
        #[arg(long)]
        book_file: Option<PathBuf>,
        /// Post the summary to this URL for a written review
        #[arg(long)]
        narrator_url: Option<String>,
    },
    /// Show the top engine lines for a position
    Hint {
        /// Position to look at
        #[arg(long)]
        fen: String,
        /// Number of lines
        #[arg(short, long, default_value = "3")]
        lines: usize,
    },
}

#[derive(Serialize)]
struct ReviewOutput<'a> {
    report: &'a AnalysisReport,
    summary: NarrativePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    narration: Option<Narration>,
}

#[derive(Serialize)]
struct HintOutput<'a> {
    fen: &'a str,
    lines: Vec<SuggestedLine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReviewConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ReviewConfig::load().context("loading review.toml")?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    tracing::info!("Backend: {:?}", config.backend);
    let oracle = Oracle::from_config(&config)
        .await
        .context("starting evaluation backend")?;
    let rules = ShakmatyRules::new();

    let result = match cli.command {
        Commands::Analyze {
            moves,
            file,
            fen,
            book,
            book_file,
            narrator_url,
        } => {
            let text = match (moves, file) {
                (Some(moves), _) => moves,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading moves from {}", path.display()))?,
                (None, None) => anyhow::bail!("either --moves or --file is required"),
            };
            let start = match fen {
                Some(fen) => rules.position_from_fen(&fen)?,
                None => rules.initial_position(),
            };
            let book = match book_file {
                Some(path) => Some(
                    OpeningBook::load(&path)
                        .with_context(|| format!("loading opening book from {}", path.display()))?,
                ),
                None if book || config.book => Some(OpeningBook::builtin()),
                None => None,
            };

            run_analysis(&oracle, &rules, &config, start, &split_move_text(&text), book, narrator_url).await
        }
        Commands::Hint { fen, lines } => {
            let position = rules.position_from_fen(&fen)?;
            let lines = chess_analysis::suggest_lines(&oracle, &rules, &position, lines).await;
            if lines.is_empty() {
                tracing::warn!("No lines available for this position");
            }
            print_json(&HintOutput { fen: &fen, lines })
        }
    };

    oracle.shutdown();
    result
}

async fn run_analysis(
    oracle: &Oracle,
    rules: &ShakmatyRules,
    config: &ReviewConfig,
    start: chess_analysis::Position,
    moves: &[String],
    book: Option<OpeningBook>,
    narrator_url: Option<String>,
) -> anyhow::Result<()> {
    // Ctrl-C stops the run between plies; completed moves are still reported.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Cancelling after the current move");
            cancel_clone.store(true, Ordering::SeqCst);
        }
    });

    let mut analyzer = GameAnalyzer::new(oracle, rules, AnalysisConfig::from(config))
        .with_cancel(cancel)
        .with_progress(|p: Progress| {
            tracing::info!("Analyzed {}/{} moves", p.processed, p.total);
        });
    if let Some(book) = book {
        analyzer = analyzer.with_book(book);
    }

    let report = analyzer.analyze_from(start, moves).await;
    if !report.is_complete() {
        tracing::warn!("Analysis incomplete: {:?}", report.status);
    }
    if report.degraded_count() > 0 {
        tracing::warn!(
            "{} of {} moves were scored without an evaluation",
            report.degraded_count(),
            report.records.len()
        );
    }

    let summary = report.narrative_payload();
    let narration = match narrator_url {
        Some(url) => {
            let narrator = HttpNarrator::new(url, NARRATOR_TIMEOUT)?;
            Some(narrate(&narrator, &summary).await)
        }
        None => None,
    };

    print_json(&ReviewOutput {
        report: &report,
        summary,
        narration,
    })
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
